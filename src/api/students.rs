use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentStaff, CurrentStudent};
use crate::api::pagination::{default_limit, PaginatedResponse};
use crate::api::subjects::build_subject_response;
use crate::core::state::AppState;
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::subject::SubjectResponse;
use crate::schemas::user::UserResponse;

#[derive(Debug, Deserialize)]
pub(crate) struct StudentListQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    search: Option<String>,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_students))
        .route("/me/subjects", get(my_subjects))
        .route("/:student_id", get(get_student))
}

async fn list_students(
    Query(params): Query<StudentListQuery>,
    CurrentStaff(_staff): CurrentStaff,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<UserResponse>>, ApiError> {
    let search = params.search.as_deref();
    let role = Some(UserRole::Student);
    let items = repositories::users::list(state.db(), role, search, params.skip, params.limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list students"))?;
    let total_count = repositories::users::count(state.db(), role, search)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count students"))?;

    Ok(Json(PaginatedResponse {
        items: items.into_iter().map(UserResponse::from_db).collect(),
        total_count,
        skip: params.skip.max(0),
        limit: params.limit.clamp(1, 1000),
    }))
}

/// Accepts the user id or the institutional id.
async fn get_student(
    Path(student_id): Path<String>,
    CurrentStaff(_staff): CurrentStaff,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, ApiError> {
    let student = repositories::users::find_by_reference(state.db(), &student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch student"))?
        .filter(|user| user.role == UserRole::Student)
        .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))?;

    Ok(Json(UserResponse::from_db(student)))
}

async fn my_subjects(
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<Vec<SubjectResponse>>, ApiError> {
    let subjects = repositories::subjects::list_for_student(state.db(), &student.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list subjects"))?;

    let mut response = Vec::with_capacity(subjects.len());
    for subject in subjects {
        response.push(build_subject_response(&state, subject).await?);
    }
    Ok(Json(response))
}
