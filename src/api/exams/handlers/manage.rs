use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentStaff, CurrentUser};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::exam::{ExamAuthoringResponse, ExamPayload, ExamTakingResponse};
use crate::schemas::MessageResponse;
use crate::services::exam_lifecycle;

use super::super::helpers;

/// Staff get the authoring view with answer keys; students get the taking view.
pub(in crate::api::exams) async fn get_exam(
    Path(exam_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let exam = helpers::fetch_exam(&state, &exam_id).await?;

    if user.role.is_staff() {
        return Ok(Json(ExamAuthoringResponse::from_db(exam)).into_response());
    }

    helpers::require_student_access(&state, &exam, &user).await?;
    Ok(Json(ExamTakingResponse::from_db(exam)).into_response())
}

pub(in crate::api::exams) async fn update_exam(
    Path(exam_id): Path<String>,
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
    Json(payload): Json<ExamPayload>,
) -> Result<Json<ExamAuthoringResponse>, ApiError> {
    let exam = helpers::fetch_exam(&state, &exam_id).await?;
    if !exam_lifecycle::is_editable(exam.status) {
        return Err(ApiError::Conflict("Only draft exams can be edited".to_string()));
    }

    let content = helpers::validate_content(payload)?;
    helpers::ensure_subject_exists(&state, &content.subject_id).await?;
    helpers::ensure_title_free(&state, &content.title, Some(&exam.id)).await?;

    let updated = repositories::exams::update_draft(
        state.db(),
        &exam.id,
        repositories::exams::UpdateExam {
            title: &content.title,
            instructions: &content.instructions,
            duration_minutes: content.duration_minutes,
            surveillance: content.surveillance,
            questions: content.questions,
            subject_id: &content.subject_id,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| {
        if crate::db::is_unique_violation(&e) {
            helpers::duplicate_title()
        } else {
            ApiError::internal(e, "Failed to update exam")
        }
    })?
    .ok_or_else(|| ApiError::Conflict("Only draft exams can be edited".to_string()))?;

    tracing::info!(user_id = %user.id, exam_id = %updated.id, "Exam updated");
    Ok(Json(ExamAuthoringResponse::from_db(updated)))
}

pub(in crate::api::exams) async fn delete_exam(
    Path(exam_id): Path<String>,
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, ApiError> {
    let exam = helpers::fetch_exam(&state, &exam_id).await?;

    let result_count = repositories::exams::count_results(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count exam results"))?;
    if result_count > 0 {
        return Err(ApiError::Conflict("Exam has recorded results and cannot be deleted".to_string()));
    }

    let deleted = repositories::exams::delete_by_id(state.db(), &exam.id).await.map_err(|e| {
        if crate::db::is_foreign_key_violation(&e) {
            ApiError::Conflict("Exam has recorded results and cannot be deleted".to_string())
        } else {
            ApiError::internal(e, "Failed to delete exam")
        }
    })?;
    if !deleted {
        return Err(ApiError::NotFound("Exam not found".to_string()));
    }

    tracing::info!(user_id = %user.id, exam_id = %exam.id, "Exam deleted");
    Ok(Json(MessageResponse::new("Exam deleted successfully")))
}
