use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::validation::require_non_blank;
use crate::core::state::AppState;
use crate::db::models::{Exam, Question, User};
use crate::repositories;
use crate::schemas::exam::ExamPayload;
use crate::services::{exam_content, exam_lifecycle};

/// Exam content after validation, ready to be written.
pub(super) struct ExamContent {
    pub(super) title: String,
    pub(super) instructions: String,
    pub(super) duration_minutes: i32,
    pub(super) surveillance: bool,
    pub(super) questions: Vec<Question>,
    pub(super) subject_id: String,
}

pub(super) async fn fetch_exam(state: &AppState, exam_id: &str) -> Result<Exam, ApiError> {
    repositories::exams::find_by_id(state.db(), exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?
        .ok_or_else(|| ApiError::NotFound("Exam not found".to_string()))
}

/// Checks run in order: title, subject, duration, then each question.
pub(super) fn validate_content(payload: ExamPayload) -> Result<ExamContent, ApiError> {
    let title = require_non_blank(&payload.title, "Exam title is required")?;
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let subject_id = require_non_blank(
        payload.subject_id.as_deref().unwrap_or_default(),
        "Subject is required",
    )?;
    let duration_minutes = exam_content::validate_duration(payload.duration_minutes)?;
    let questions = exam_content::normalize_questions(payload.questions)?;

    Ok(ExamContent {
        title,
        instructions: payload.instructions.trim().to_string(),
        duration_minutes,
        surveillance: payload.surveillance,
        questions,
        subject_id,
    })
}

pub(super) async fn ensure_subject_exists(state: &AppState, subject_id: &str) -> Result<(), ApiError> {
    repositories::subjects::find_by_id(state.db(), subject_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch subject"))?
        .map(|_| ())
        .ok_or_else(|| ApiError::BadRequest("Invalid subject ID".to_string()))
}

pub(super) async fn ensure_title_free(
    state: &AppState,
    title: &str,
    exclude_id: Option<&str>,
) -> Result<(), ApiError> {
    let taken = repositories::exams::title_taken(state.db(), title, exclude_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check exam title"))?;
    if taken {
        Err(duplicate_title())
    } else {
        Ok(())
    }
}

pub(super) fn duplicate_title() -> ApiError {
    ApiError::Conflict("Exam title already exists".to_string())
}

/// Students reach an exam only while it is published and they are enrolled in its subject.
pub(super) async fn require_student_access(
    state: &AppState,
    exam: &Exam,
    student: &User,
) -> Result<(), ApiError> {
    if !exam_lifecycle::is_visible_to_students(exam.status) {
        return Err(ApiError::Forbidden("Exam is not available"));
    }

    let enrolled = repositories::enrollments::is_enrolled(state.db(), &exam.subject_id, &student.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check enrollment"))?;
    if !enrolled {
        return Err(ApiError::Forbidden("You are not enrolled in this exam's subject"));
    }

    Ok(())
}
