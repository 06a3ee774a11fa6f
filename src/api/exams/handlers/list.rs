use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentStaff, CurrentUser};
use crate::api::pagination::PaginatedResponse;
use crate::core::state::AppState;
use crate::repositories;
use crate::repositories::exams::ExamFilter;
use crate::schemas::exam::ExamSummaryResponse;
use crate::schemas::result::ExamResultEntry;
use crate::services::exam_lifecycle;

use super::super::helpers;
use super::super::queries::ExamListQuery;

pub(in crate::api::exams) async fn list_exams(
    Query(params): Query<ExamListQuery>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<ExamSummaryResponse>>, ApiError> {
    let status = params
        .status
        .as_deref()
        .filter(|value| !value.trim().is_empty())
        .map(exam_lifecycle::parse_status)
        .transpose()?;

    // Students only ever see published exams of subjects they are enrolled in.
    let filter = ExamFilter {
        subject_id: params.subject_id.as_deref().filter(|value| !value.is_empty()),
        status,
        student_id: (!user.role.is_staff()).then_some(user.id.as_str()),
    };

    let exams = repositories::exams::list(state.db(), filter, params.skip, params.limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list exams"))?;
    let total_count = repositories::exams::count(state.db(), filter)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count exams"))?;

    Ok(Json(PaginatedResponse {
        items: exams.into_iter().map(ExamSummaryResponse::from_db).collect(),
        total_count,
        skip: params.skip.max(0),
        limit: params.limit.clamp(1, 1000),
    }))
}

pub(in crate::api::exams) async fn list_exam_results(
    Path(exam_id): Path<String>,
    CurrentStaff(_staff): CurrentStaff,
    State(state): State<AppState>,
) -> Result<Json<Vec<ExamResultEntry>>, ApiError> {
    let exam = helpers::fetch_exam(&state, &exam_id).await?;

    let rows = repositories::results::list_for_exam(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list exam results"))?;

    Ok(Json(rows.into_iter().map(ExamResultEntry::from_row).collect()))
}
