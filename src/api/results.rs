use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentStudent, CurrentUser};
use crate::api::pagination::{default_limit, PaginatedResponse};
use crate::core::metrics;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{ExamAttempt, ExamResult};
use crate::db::types::AttemptStatus;
use crate::repositories;
use crate::schemas::result::{ResultResponse, ResultSubmit};
use crate::services::{attempt_timing, exam_lifecycle, grading};

#[derive(Debug, Deserialize)]
pub(crate) struct ResultListQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default, alias = "examId")]
    exam_id: Option<String>,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_results).post(submit_result))
        .route("/:result_id", get(get_result))
}

fn already_recorded() -> ApiError {
    ApiError::Conflict("Result already recorded for this exam".to_string())
}

fn closed_attempt(status: AttemptStatus) -> ApiError {
    match status {
        AttemptStatus::Expired => ApiError::BadRequest("Attempt has expired".to_string()),
        AttemptStatus::Submitted => already_recorded(),
        AttemptStatus::Active => ApiError::BadRequest("No active attempt for this exam".to_string()),
    }
}

/// Closes the attempt and inserts the result in one transaction.
///
/// The attempt may have changed since it was read as active; a lost race is reported from
/// its current status rather than assumed to be a duplicate.
async fn record_result(
    state: &AppState,
    attempt: &ExamAttempt,
    params: repositories::results::CreateResult<'_>,
) -> Result<ExamResult, ApiError> {
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let submitted =
        repositories::attempts::mark_submitted(&mut *tx, &attempt.id, params.completed_at)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to close attempt"))?;
    if !submitted {
        let current = repositories::attempts::find_by_exam_and_student(
            &mut *tx,
            &attempt.exam_id,
            &attempt.student_id,
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?;
        let status = current.map_or(AttemptStatus::Active, |current| current.status);
        tracing::info!(
            attempt_id = %attempt.id,
            status = ?status,
            "Attempt closed before the submission was recorded"
        );
        return Err(closed_attempt(status));
    }

    let result = repositories::results::insert_if_absent(&mut *tx, params)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to record result"))?
        .ok_or_else(already_recorded)?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit result"))?;
    Ok(result)
}

/// Grades a submission against the stored answer key and records it once per student and exam.
async fn submit_result(
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
    Json(payload): Json<ResultSubmit>,
) -> Result<(StatusCode, Json<ResultResponse>), ApiError> {
    let exam = repositories::exams::find_by_id(state.db(), payload.exam_id.trim())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?
        .ok_or_else(|| ApiError::NotFound("Exam not found".to_string()))?;

    if !exam_lifecycle::is_visible_to_students(exam.status) {
        return Err(ApiError::Forbidden("Exam is not available"));
    }

    let already_recorded_result =
        repositories::results::exists_for_user(state.db(), &student.id, &exam.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to check existing result"))?;
    if already_recorded_result {
        return Err(already_recorded());
    }

    let attempt = repositories::attempts::find_by_exam_and_student(state.db(), &exam.id, &student.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?
        .ok_or_else(|| ApiError::BadRequest("No active attempt for this exam".to_string()))?;
    if attempt.status != AttemptStatus::Active {
        return Err(closed_attempt(attempt.status));
    }

    let now = primitive_now_utc();
    let grace = state.settings().exam().submit_grace_period_seconds;
    if !attempt_timing::within_submit_window(now, attempt.expires_at, grace) {
        repositories::attempts::mark_expired(state.db(), &attempt.id, now)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to expire attempt"))?;
        tracing::info!(
            user_id = %student.id,
            exam_id = %exam.id,
            attempt_id = %attempt.id,
            "Late submission rejected"
        );
        return Err(ApiError::BadRequest("Attempt has expired".to_string()));
    }

    let answers = payload.normalized_answers();
    let grade = grading::grade(&exam.questions.0, &answers);

    let result = record_result(
        &state,
        &attempt,
        repositories::results::CreateResult {
            id: &Uuid::new_v4().to_string(),
            user_id: &student.id,
            exam_id: &exam.id,
            answers,
            score: grade.score,
            correct_answers: grade.correct_answers,
            total_questions: grade.total_questions,
            completed_at: now,
        },
    )
    .await?;

    metrics::result_recorded(result.score);
    tracing::info!(
        user_id = %student.id,
        exam_id = %exam.id,
        result_id = %result.id,
        score = result.score,
        correct_answers = result.correct_answers,
        total_questions = result.total_questions,
        "Result recorded"
    );

    Ok((StatusCode::CREATED, Json(ResultResponse::from_db(result))))
}

async fn list_results(
    Query(params): Query<ResultListQuery>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<ResultResponse>>, ApiError> {
    let user_id = (!user.role.is_staff()).then_some(user.id.as_str());
    let exam_id = params.exam_id.as_deref().filter(|value| !value.is_empty());

    let items = repositories::results::list(state.db(), user_id, exam_id, params.skip, params.limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list results"))?;
    let total_count = repositories::results::count(state.db(), user_id, exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count results"))?;

    Ok(Json(PaginatedResponse {
        items: items.into_iter().map(ResultResponse::from_db).collect(),
        total_count,
        skip: params.skip.max(0),
        limit: params.limit.clamp(1, 1000),
    }))
}

async fn get_result(
    Path(result_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ResultResponse>, ApiError> {
    let result = repositories::results::find_by_id(state.db(), &result_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch result"))?
        .ok_or_else(|| ApiError::NotFound("Result not found".to_string()))?;

    if result.user_id != user.id && !user.role.is_staff() {
        return Err(ApiError::Forbidden("Access denied"));
    }

    Ok(Json(ResultResponse::from_db(result)))
}

#[cfg(test)]
mod tests;
