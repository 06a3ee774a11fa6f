use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{AttemptStatus, CourseLevel, ExamStatus, QuestionType, UserRole};

#[derive(Debug, Clone, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) role: UserRole,
    pub(crate) institutional_id: Option<String>,
    pub(crate) email: String,
    pub(crate) hashed_password: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) profile_picture: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

impl User {
    pub(crate) fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct Subject {
    pub(crate) id: String,
    pub(crate) subject_name: String,
    pub(crate) subject_code: String,
    pub(crate) course_level: CourseLevel,
    pub(crate) prerequisite: Option<String>,
    pub(crate) assigned_faculty_id: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct Attachment {
    #[serde(default)]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) url: String,
    #[serde(default, rename = "type")]
    pub(crate) mime_type: String,
}

/// Multiple-choice answers are option indices; the other question types compare text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub(crate) enum CorrectAnswer {
    Index(usize),
    Text(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) text: String,
    #[serde(rename = "type", default)]
    pub(crate) question_type: QuestionType,
    #[serde(default)]
    pub(crate) options: Vec<String>,
    pub(crate) correct_answer: CorrectAnswer,
    #[serde(default)]
    pub(crate) attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct Exam {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) instructions: String,
    pub(crate) duration_minutes: i32,
    pub(crate) surveillance: bool,
    pub(crate) questions: Json<Vec<Question>>,
    pub(crate) created_by: String,
    pub(crate) subject_id: String,
    pub(crate) status: ExamStatus,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
    pub(crate) published_at: Option<PrimitiveDateTime>,
    pub(crate) closed_at: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct ExamAttempt {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) student_id: String,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) expires_at: PrimitiveDateTime,
    pub(crate) submitted_at: Option<PrimitiveDateTime>,
    pub(crate) status: AttemptStatus,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct ExamResult {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) exam_id: String,
    pub(crate) answers: Json<BTreeMap<String, String>>,
    pub(crate) score: i32,
    pub(crate) correct_answers: i32,
    pub(crate) total_questions: i32,
    pub(crate) completed_at: PrimitiveDateTime,
}
