use axum::{
    extract::{Path, State},
    Json,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentStaff;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::User;
use crate::repositories;
use crate::schemas::exam::{ExamAuthoringResponse, ExamStatusRequest, StatusUpdate};
use crate::services::exam_lifecycle::{self, Transition};

use super::super::helpers;

pub(in crate::api::exams) async fn set_status(
    Path(exam_id): Path<String>,
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
    Json(payload): Json<StatusUpdate>,
) -> Result<Json<ExamAuthoringResponse>, ApiError> {
    apply_status(&state, &user, &exam_id, &payload.status).await
}

pub(in crate::api::exams) async fn set_status_by_body(
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
    Json(payload): Json<ExamStatusRequest>,
) -> Result<Json<ExamAuthoringResponse>, ApiError> {
    apply_status(&state, &user, &payload.exam_id, &payload.status).await
}

async fn apply_status(
    state: &AppState,
    user: &User,
    exam_id: &str,
    raw_status: &str,
) -> Result<Json<ExamAuthoringResponse>, ApiError> {
    let requested = exam_lifecycle::parse_status(raw_status)?;
    let exam = helpers::fetch_exam(state, exam_id).await?;

    let (from, to) = match exam_lifecycle::plan_transition(exam.status, requested)? {
        Transition::Unchanged => return Ok(Json(ExamAuthoringResponse::from_db(exam))),
        Transition::Move { from, to } => (from, to),
    };

    let updated = repositories::exams::transition_status(
        state.db(),
        &exam.id,
        from,
        to,
        exam_lifecycle::is_active_flag(to),
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update exam status"))?
    .ok_or_else(|| ApiError::Conflict("Exam status changed concurrently, reload and retry".to_string()))?;

    tracing::info!(
        user_id = %user.id,
        exam_id = %updated.id,
        from = from.as_str(),
        to = to.as_str(),
        "Exam status changed"
    );

    Ok(Json(ExamAuthoringResponse::from_db(updated)))
}
