use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Attachment, Exam, ExamAttempt, Question};
use crate::db::types::{AttemptStatus, ExamStatus, QuestionType};

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct AttachmentInput {
    #[serde(default)]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) url: Option<String>,
    #[serde(default, rename = "type", alias = "mime_type", alias = "mimeType")]
    pub(crate) mime_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct QuestionInput {
    #[serde(default)]
    pub(crate) id: Option<String>,
    #[serde(default)]
    pub(crate) text: String,
    #[serde(default, rename = "type", alias = "question_type", alias = "questionType")]
    pub(crate) question_type: QuestionType,
    #[serde(default)]
    pub(crate) options: Vec<String>,
    #[serde(default, alias = "correctAnswer")]
    pub(crate) correct_answer: serde_json::Value,
    #[serde(default)]
    pub(crate) attachments: Vec<AttachmentInput>,
}

/// Body of exam creation and full exam edits.
#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExamPayload {
    #[validate(length(min = 1, max = 255, message = "Exam title is required"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) instructions: String,
    #[serde(default, alias = "duration", alias = "durationMinutes")]
    pub(crate) duration_minutes: Option<i32>,
    #[serde(default)]
    pub(crate) surveillance: bool,
    #[serde(default)]
    pub(crate) questions: Vec<QuestionInput>,
    #[serde(default, alias = "subject", alias = "subjectId")]
    pub(crate) subject_id: Option<String>,
    /// Admins may author on behalf of a teacher; ignored on edits.
    #[serde(default, alias = "createdBy")]
    pub(crate) created_by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusUpdate {
    pub(crate) status: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExamStatusRequest {
    #[serde(alias = "examId")]
    pub(crate) exam_id: String,
    pub(crate) status: String,
}

/// Full exam including the answer key; staff only.
#[derive(Debug, Serialize)]
pub(crate) struct ExamAuthoringResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) instructions: String,
    pub(crate) duration_minutes: i32,
    pub(crate) surveillance: bool,
    pub(crate) questions: Vec<Question>,
    pub(crate) question_count: usize,
    pub(crate) created_by: String,
    pub(crate) subject_id: String,
    pub(crate) status: ExamStatus,
    pub(crate) is_active: bool,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
    pub(crate) published_at: Option<String>,
    pub(crate) closed_at: Option<String>,
}

impl ExamAuthoringResponse {
    pub(crate) fn from_db(exam: Exam) -> Self {
        let questions = exam.questions.0;
        Self {
            id: exam.id,
            title: exam.title,
            instructions: exam.instructions,
            duration_minutes: exam.duration_minutes,
            surveillance: exam.surveillance,
            question_count: questions.len(),
            questions,
            created_by: exam.created_by,
            subject_id: exam.subject_id,
            status: exam.status,
            is_active: exam.is_active,
            created_at: format_primitive(exam.created_at),
            updated_at: format_primitive(exam.updated_at),
            published_at: exam.published_at.map(format_primitive),
            closed_at: exam.closed_at.map(format_primitive),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct TakingQuestionView {
    pub(crate) id: String,
    pub(crate) text: String,
    #[serde(rename = "type")]
    pub(crate) question_type: QuestionType,
    pub(crate) options: Vec<String>,
    pub(crate) attachments: Vec<Attachment>,
}

/// What a student sees: questions without their correct answers.
#[derive(Debug, Serialize)]
pub(crate) struct ExamTakingResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) instructions: String,
    pub(crate) duration_minutes: i32,
    pub(crate) surveillance: bool,
    pub(crate) subject_id: String,
    pub(crate) status: ExamStatus,
    pub(crate) questions: Vec<TakingQuestionView>,
}

impl ExamTakingResponse {
    pub(crate) fn from_db(exam: Exam) -> Self {
        let questions = exam
            .questions
            .0
            .into_iter()
            .map(|question| TakingQuestionView {
                id: question.id,
                text: question.text,
                question_type: question.question_type,
                options: question.options,
                attachments: question.attachments,
            })
            .collect();

        Self {
            id: exam.id,
            title: exam.title,
            instructions: exam.instructions,
            duration_minutes: exam.duration_minutes,
            surveillance: exam.surveillance,
            subject_id: exam.subject_id,
            status: exam.status,
            questions,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamSummaryResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) duration_minutes: i32,
    pub(crate) surveillance: bool,
    pub(crate) subject_id: String,
    pub(crate) created_by: String,
    pub(crate) status: ExamStatus,
    pub(crate) question_count: usize,
    pub(crate) created_at: String,
    pub(crate) published_at: Option<String>,
}

impl ExamSummaryResponse {
    pub(crate) fn from_db(exam: Exam) -> Self {
        Self {
            question_count: exam.questions.0.len(),
            id: exam.id,
            title: exam.title,
            duration_minutes: exam.duration_minutes,
            surveillance: exam.surveillance,
            subject_id: exam.subject_id,
            created_by: exam.created_by,
            status: exam.status,
            created_at: format_primitive(exam.created_at),
            published_at: exam.published_at.map(format_primitive),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) status: AttemptStatus,
    pub(crate) started_at: String,
    pub(crate) expires_at: String,
    pub(crate) submitted_at: Option<String>,
}

impl AttemptResponse {
    pub(crate) fn from_db(attempt: ExamAttempt) -> Self {
        Self {
            id: attempt.id,
            exam_id: attempt.exam_id,
            status: attempt.status,
            started_at: format_primitive(attempt.started_at),
            expires_at: format_primitive(attempt.expires_at),
            submitted_at: attempt.submitted_at.map(format_primitive),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptStartResponse {
    pub(crate) exam: ExamTakingResponse,
    pub(crate) attempt: AttemptResponse,
    pub(crate) remaining_seconds: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::CorrectAnswer;
    use sqlx::types::Json;
    use time::macros::datetime;

    fn exam() -> Exam {
        Exam {
            id: "exam-1".to_string(),
            title: "Data Structures Midterm".to_string(),
            instructions: "No notes".to_string(),
            duration_minutes: 60,
            surveillance: true,
            questions: Json(vec![Question {
                id: "q1".to_string(),
                text: "Pick the stack".to_string(),
                question_type: QuestionType::MultipleChoice,
                options: vec!["FIFO".to_string(), "LIFO".to_string()],
                correct_answer: CorrectAnswer::Index(1),
                attachments: Vec::new(),
            }]),
            created_by: "teacher-1".to_string(),
            subject_id: "subject-1".to_string(),
            status: ExamStatus::Published,
            is_active: true,
            created_at: datetime!(2025-04-01 08:00:00),
            updated_at: datetime!(2025-04-01 08:00:00),
            published_at: Some(datetime!(2025-04-02 08:00:00)),
            closed_at: None,
        }
    }

    #[test]
    fn taking_view_omits_correct_answers() {
        let json = serde_json::to_value(ExamTakingResponse::from_db(exam())).unwrap();
        let question = &json["questions"][0];
        assert!(question.get("correct_answer").is_none());
        assert_eq!(question["type"], "multiple-choice");
        assert_eq!(question["options"][1], "LIFO");
    }

    #[test]
    fn authoring_view_keeps_correct_answers() {
        let json = serde_json::to_value(ExamAuthoringResponse::from_db(exam())).unwrap();
        assert_eq!(json["questions"][0]["correct_answer"], 1);
        assert_eq!(json["question_count"], 1);
        assert_eq!(json["published_at"], "2025-04-02T08:00:00Z");
    }

    #[test]
    fn payload_accepts_legacy_field_names() {
        let payload: ExamPayload = serde_json::from_value(serde_json::json!({
            "title": "Quiz",
            "duration": 45,
            "subject": "subject-9",
            "questions": []
        }))
        .unwrap();
        assert_eq!(payload.duration_minutes, Some(45));
        assert_eq!(payload.subject_id.as_deref(), Some("subject-9"));
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn empty_title_fails_validation() {
        let payload: ExamPayload =
            serde_json::from_value(serde_json::json!({"title": "", "duration": 10})).unwrap();
        assert!(payload.validate().is_err());
    }
}
