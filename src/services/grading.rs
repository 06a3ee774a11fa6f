//! Scoring of submitted answer maps against an exam's answer key.
//!
//! Grading is a pure function of the questions and the answers, so re-deriving a stored result
//! always yields the same numbers.

use std::collections::BTreeMap;

use crate::db::models::{CorrectAnswer, Question};
use crate::db::types::QuestionType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Grade {
    pub(crate) score: i32,
    pub(crate) correct_answers: i32,
    pub(crate) total_questions: i32,
}

pub(crate) fn grade(questions: &[Question], answers: &BTreeMap<String, String>) -> Grade {
    let correct = questions
        .iter()
        .filter(|question| {
            answers.get(&question.id).is_some_and(|answer| is_correct(question, answer))
        })
        .count();

    let total = questions.len();
    Grade {
        score: percentage(correct, total),
        correct_answers: correct as i32,
        total_questions: total as i32,
    }
}

pub(crate) fn is_correct(question: &Question, answer: &str) -> bool {
    match (question.question_type, &question.correct_answer) {
        (QuestionType::MultipleChoice, CorrectAnswer::Index(expected)) => {
            answer.trim().parse::<usize>().is_ok_and(|chosen| chosen == *expected)
        }
        // Unnormalized legacy keys may still hold the index as text.
        (QuestionType::MultipleChoice, CorrectAnswer::Text(expected)) => {
            match (answer.trim().parse::<usize>(), expected.trim().parse::<usize>()) {
                (Ok(chosen), Ok(expected)) => chosen == expected,
                _ => false,
            }
        }
        (QuestionType::TextBased, expected) => {
            normalize_text(answer) == normalize_text(&expected_text(expected))
        }
        (QuestionType::Coding, expected) => answer.trim() == expected_text(expected).trim(),
    }
}

/// `100 * correct / total` rounded half up; an exam without questions scores 0.
pub(crate) fn percentage(correct: usize, total: usize) -> i32 {
    if total == 0 {
        return 0;
    }
    let correct = correct.min(total) as u64;
    let total = total as u64;
    ((200 * correct + total) / (2 * total)) as i32
}

fn expected_text(expected: &CorrectAnswer) -> String {
    match expected {
        CorrectAnswer::Index(index) => index.to_string(),
        CorrectAnswer::Text(text) => text.clone(),
    }
}

fn normalize_text(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}
