use std::collections::HashSet;

use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::db::models::{Attachment, CorrectAnswer, Question};
use crate::db::types::QuestionType;
use crate::schemas::exam::QuestionInput;

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum ContentError {
    #[error("Duration must be a positive number")]
    NonPositiveDuration,
    #[error("Question {position} must have text")]
    EmptyText { position: usize },
    #[error("Question {position} is missing a correct answer")]
    MissingCorrectAnswer { position: usize },
    #[error("Question {position} correct answer must be an option index")]
    InvalidIndex { position: usize },
    #[error("Question {position} correct answer {index} is out of range for {options} options")]
    IndexOutOfRange { position: usize, index: usize, options: usize },
    #[error("Duplicate question id '{0}'")]
    DuplicateId(String),
}

pub(crate) fn validate_duration(duration_minutes: Option<i32>) -> Result<i32, ContentError> {
    match duration_minutes {
        Some(minutes) if minutes > 0 => Ok(minutes),
        _ => Err(ContentError::NonPositiveDuration),
    }
}

/// Turns authoring input into stored questions: ids are assigned where missing, multiple-choice
/// keys become integer indices, and attachment fields default to empty strings.
pub(crate) fn normalize_questions(
    inputs: Vec<QuestionInput>,
) -> Result<Vec<Question>, ContentError> {
    let mut seen = HashSet::with_capacity(inputs.len());
    let mut questions = Vec::with_capacity(inputs.len());

    for (offset, input) in inputs.into_iter().enumerate() {
        let position = offset + 1;
        let text = input.text.trim().to_string();
        if text.is_empty() {
            return Err(ContentError::EmptyText { position });
        }

        let id = input
            .id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        if !seen.insert(id.clone()) {
            return Err(ContentError::DuplicateId(id));
        }

        let correct_answer = match input.question_type {
            QuestionType::MultipleChoice => {
                let index = parse_index(&input.correct_answer, position)?;
                if index >= input.options.len() {
                    return Err(ContentError::IndexOutOfRange {
                        position,
                        index,
                        options: input.options.len(),
                    });
                }
                CorrectAnswer::Index(index)
            }
            QuestionType::TextBased | QuestionType::Coding => {
                CorrectAnswer::Text(parse_text(&input.correct_answer, position)?)
            }
        };

        let attachments = input
            .attachments
            .into_iter()
            .map(|attachment| Attachment {
                name: attachment.name.unwrap_or_default(),
                url: attachment.url.unwrap_or_default(),
                mime_type: attachment.mime_type.unwrap_or_default(),
            })
            .collect();

        questions.push(Question {
            id,
            text,
            question_type: input.question_type,
            options: input.options,
            correct_answer,
            attachments,
        });
    }

    Ok(questions)
}

fn parse_index(value: &Value, position: usize) -> Result<usize, ContentError> {
    match value {
        Value::Null => Err(ContentError::MissingCorrectAnswer { position }),
        Value::Number(number) => number
            .as_u64()
            .map(|index| index as usize)
            .ok_or(ContentError::InvalidIndex { position }),
        Value::String(raw) if raw.trim().is_empty() => {
            Err(ContentError::MissingCorrectAnswer { position })
        }
        Value::String(raw) => {
            raw.trim().parse::<usize>().map_err(|_| ContentError::InvalidIndex { position })
        }
        _ => Err(ContentError::InvalidIndex { position }),
    }
}

fn parse_text(value: &Value, position: usize) -> Result<String, ContentError> {
    let text = match value {
        Value::String(raw) => raw.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        _ => String::new(),
    };

    if text.trim().is_empty() {
        Err(ContentError::MissingCorrectAnswer { position })
    } else {
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn inputs(value: serde_json::Value) -> Vec<QuestionInput> {
        serde_json::from_value(value).expect("question inputs")
    }

    #[test]
    fn duration_must_be_positive() {
        assert_eq!(validate_duration(Some(1)), Ok(1));
        assert_eq!(validate_duration(Some(0)), Err(ContentError::NonPositiveDuration));
        assert_eq!(validate_duration(Some(-5)), Err(ContentError::NonPositiveDuration));
        assert_eq!(validate_duration(None), Err(ContentError::NonPositiveDuration));
    }

    #[test]
    fn multiple_choice_string_index_becomes_integer() {
        let questions = normalize_questions(inputs(json!([
            {"id": "q1", "text": "Pick", "type": "multiple-choice", "options": ["a", "b"], "correctAnswer": "1"}
        ])))
        .expect("normalized");

        assert_eq!(questions[0].correct_answer, CorrectAnswer::Index(1));
        assert_eq!(questions[0].id, "q1");
    }

    #[test]
    fn type_defaults_to_multiple_choice() {
        let questions = normalize_questions(inputs(json!([
            {"text": "Pick", "options": ["a"], "correct_answer": 0}
        ])))
        .expect("normalized");

        assert_eq!(questions[0].question_type, QuestionType::MultipleChoice);
        assert!(!questions[0].id.is_empty());
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let err = normalize_questions(inputs(json!([
            {"text": "Pick", "options": ["a", "b"], "correct_answer": 2}
        ])))
        .unwrap_err();

        assert_eq!(err, ContentError::IndexOutOfRange { position: 1, index: 2, options: 2 });
    }

    #[test]
    fn negative_or_textual_index_is_rejected() {
        let negative = normalize_questions(inputs(json!([
            {"text": "Pick", "options": ["a"], "correct_answer": -1}
        ])));
        assert_eq!(negative.unwrap_err(), ContentError::InvalidIndex { position: 1 });

        let word = normalize_questions(inputs(json!([
            {"text": "Pick", "options": ["a"], "correct_answer": "first"}
        ])));
        assert_eq!(word.unwrap_err(), ContentError::InvalidIndex { position: 1 });
    }

    #[test]
    fn text_questions_need_an_answer() {
        let err = normalize_questions(inputs(json!([
            {"text": "Explain", "type": "text-based", "correct_answer": "  "}
        ])))
        .unwrap_err();
        assert_eq!(err, ContentError::MissingCorrectAnswer { position: 1 });
    }

    #[test]
    fn attachments_fill_missing_fields() {
        let questions = normalize_questions(inputs(json!([
            {
                "text": "Write code",
                "type": "coding",
                "correct_answer": "print(1)",
                "attachments": [{"url": "https://cdn.example/a.png"}]
            }
        ])))
        .expect("normalized");

        let attachment = &questions[0].attachments[0];
        assert_eq!(attachment.name, "");
        assert_eq!(attachment.url, "https://cdn.example/a.png");
        assert_eq!(attachment.mime_type, "");
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = normalize_questions(inputs(json!([
            {"id": "q1", "text": "A", "options": ["x"], "correct_answer": 0},
            {"id": "q1", "text": "B", "options": ["x"], "correct_answer": 0}
        ])))
        .unwrap_err();
        assert_eq!(err, ContentError::DuplicateId("q1".to_string()));
    }

    #[test]
    fn blank_text_reports_position() {
        let err = normalize_questions(inputs(json!([
            {"text": "A", "options": ["x"], "correct_answer": 0},
            {"text": " ", "options": ["x"], "correct_answer": 0}
        ])))
        .unwrap_err();
        assert_eq!(err, ContentError::EmptyText { position: 2 });
    }
}
