use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentStudent;
use crate::core::metrics;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::ExamAttempt;
use crate::db::types::AttemptStatus;
use crate::repositories;
use crate::schemas::exam::{AttemptResponse, AttemptStartResponse, ExamTakingResponse};
use crate::services::attempt_timing;

use super::super::helpers;

/// Starts the caller's attempt on a published exam, or resumes the one already running.
pub(in crate::api::exams) async fn start_attempt(
    Path(exam_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<AttemptStartResponse>), ApiError> {
    let exam = helpers::fetch_exam(&state, &exam_id).await?;
    helpers::require_student_access(&state, &exam, &student).await?;

    let already_graded = repositories::results::exists_for_user(state.db(), &student.id, &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check existing result"))?;
    if already_graded {
        return Err(ApiError::Conflict("Exam already submitted".to_string()));
    }

    let now = primitive_now_utc();
    let existing = repositories::attempts::find_by_exam_and_student(state.db(), &exam.id, &student.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?;

    let (status, attempt) = match existing {
        Some(attempt) => (StatusCode::OK, resume(&state, attempt, now).await?),
        None => {
            let expires_at = attempt_timing::compute_expires_at(now, exam.duration_minutes);
            let created = repositories::attempts::create(
                state.db(),
                repositories::attempts::CreateAttempt {
                    id: &Uuid::new_v4().to_string(),
                    exam_id: &exam.id,
                    student_id: &student.id,
                    started_at: now,
                    expires_at,
                },
            )
            .await
            .map_err(|e| ApiError::internal(e, "Failed to start attempt"))?;

            // A concurrent request may have inserted first; either way the stored row wins.
            let attempt =
                repositories::attempts::find_by_exam_and_student(state.db(), &exam.id, &student.id)
                    .await
                    .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?
                    .ok_or_else(|| ApiError::Internal("Failed to start attempt".to_string()))?;

            if created {
                metrics::attempt_started();
                tracing::info!(
                    user_id = %student.id,
                    exam_id = %exam.id,
                    attempt_id = %attempt.id,
                    expires_at = %attempt.expires_at,
                    "Exam attempt started"
                );
                (StatusCode::CREATED, attempt)
            } else {
                (StatusCode::OK, resume(&state, attempt, now).await?)
            }
        }
    };

    let remaining_seconds = attempt_timing::remaining_seconds(now, attempt.expires_at);
    Ok((
        status,
        Json(AttemptStartResponse {
            exam: ExamTakingResponse::from_db(exam),
            attempt: AttemptResponse::from_db(attempt),
            remaining_seconds,
        }),
    ))
}

/// An active attempt is handed back while it can still be submitted; past the submit window
/// it is expired on the spot.
async fn resume(
    state: &AppState,
    attempt: ExamAttempt,
    now: PrimitiveDateTime,
) -> Result<ExamAttempt, ApiError> {
    match attempt.status {
        AttemptStatus::Submitted => Err(ApiError::Conflict("Exam already submitted".to_string())),
        AttemptStatus::Expired => Err(ApiError::Conflict("Attempt has expired".to_string())),
        AttemptStatus::Active => {
            let grace = state.settings().exam().submit_grace_period_seconds;
            if attempt_timing::within_submit_window(now, attempt.expires_at, grace) {
                return Ok(attempt);
            }

            repositories::attempts::mark_expired(state.db(), &attempt.id, now)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to expire attempt"))?;
            tracing::info!(attempt_id = %attempt.id, exam_id = %attempt.exam_id, "Attempt expired on resume");
            Err(ApiError::Conflict("Attempt has expired".to_string()))
        }
    }
}
