use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::time::format_primitive;
use crate::db::models::ExamResult;
use crate::repositories::results::ExamResultRow;

#[derive(Debug, Deserialize)]
pub(crate) struct ResultSubmit {
    #[serde(alias = "examId")]
    pub(crate) exam_id: String,
    #[serde(default)]
    pub(crate) answers: BTreeMap<String, Value>,
}

impl ResultSubmit {
    /// Answers are stored as strings; numeric and boolean values are stringified and nulls
    /// dropped.
    pub(crate) fn normalized_answers(&self) -> BTreeMap<String, String> {
        self.answers
            .iter()
            .filter_map(|(question_id, value)| Some((question_id.clone(), answer_text(value)?)))
            .collect()
    }
}

pub(crate) fn answer_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ResultResponse {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) exam_id: String,
    pub(crate) answers: BTreeMap<String, String>,
    pub(crate) score: i32,
    pub(crate) correct_answers: i32,
    pub(crate) total_questions: i32,
    pub(crate) completed_at: String,
}

impl ResultResponse {
    pub(crate) fn from_db(result: ExamResult) -> Self {
        Self {
            id: result.id,
            user_id: result.user_id,
            exam_id: result.exam_id,
            answers: result.answers.0,
            score: result.score,
            correct_answers: result.correct_answers,
            total_questions: result.total_questions,
            completed_at: format_primitive(result.completed_at),
        }
    }
}

/// One row of an exam's result sheet.
#[derive(Debug, Serialize)]
pub(crate) struct ExamResultEntry {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) student_name: String,
    pub(crate) institutional_id: Option<String>,
    pub(crate) score: i32,
    pub(crate) correct_answers: i32,
    pub(crate) total_questions: i32,
    pub(crate) completed_at: String,
}

impl ExamResultEntry {
    pub(crate) fn from_row(row: ExamResultRow) -> Self {
        Self {
            student_name: format!("{} {}", row.first_name, row.last_name).trim().to_string(),
            id: row.id,
            user_id: row.user_id,
            institutional_id: row.institutional_id,
            score: row.score,
            correct_answers: row.correct_answers,
            total_questions: row.total_questions,
            completed_at: format_primitive(row.completed_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_are_stringified() {
        let submit: ResultSubmit = serde_json::from_value(serde_json::json!({
            "examId": "exam-1",
            "answers": {"q1": 2, "q2": "Binary tree", "q3": null, "q4": true}
        }))
        .unwrap();

        let answers = submit.normalized_answers();
        assert_eq!(answers.get("q1").map(String::as_str), Some("2"));
        assert_eq!(answers.get("q2").map(String::as_str), Some("Binary tree"));
        assert!(!answers.contains_key("q3"));
        assert_eq!(answers.get("q4").map(String::as_str), Some("true"));
    }

    #[test]
    fn missing_answers_default_to_empty() {
        let submit: ResultSubmit =
            serde_json::from_value(serde_json::json!({"exam_id": "exam-1"})).unwrap();
        assert!(submit.normalized_answers().is_empty());
    }
}
