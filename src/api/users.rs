use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::api::pagination::{default_limit, PaginatedResponse};
use crate::api::validation::require_institutional_id;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::user::{AdminUserUpdate, ProfilePictureUpdate, UserResponse};
use crate::schemas::MessageResponse;
use crate::services::identity;

#[derive(Debug, Deserialize)]
pub(crate) struct UserListQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    role: Option<UserRole>,
    #[serde(default)]
    search: Option<String>,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/me/profile-picture", put(update_profile_picture))
        .route("/:user_id", get(get_user).put(update_user).delete(delete_user))
}

async fn list_users(
    Query(params): Query<UserListQuery>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<UserResponse>>, ApiError> {
    let search = params.search.as_deref();
    let items = repositories::users::list(state.db(), params.role, search, params.skip, params.limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list users"))?;
    let total_count = repositories::users::count(state.db(), params.role, search)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count users"))?;

    Ok(Json(PaginatedResponse {
        items: items.into_iter().map(UserResponse::from_db).collect(),
        total_count,
        skip: params.skip.max(0),
        limit: params.limit.clamp(1, 1000),
    }))
}

async fn get_user(
    Path(user_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = repositories::users::find_by_id(state.db(), &user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch user"))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse::from_db(user)))
}

async fn update_user(
    Path(user_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<AdminUserUpdate>,
) -> Result<Json<UserResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let institutional_id = payload
        .institutional_id
        .as_deref()
        .map(|value| require_institutional_id(value, "Institutional ID"))
        .transpose()?;

    let update = repositories::users::UpdateUser {
        institutional_id,
        email: payload.email.as_deref().map(identity::normalize_email),
        first_name: payload.first_name.map(|value| value.trim().to_string()),
        last_name: payload.last_name.map(|value| value.trim().to_string()),
        profile_picture: payload.profile_picture,
        is_active: payload.is_active,
        ..Default::default()
    };

    let user = repositories::users::update(state.db(), &user_id, update, primitive_now_utc())
        .await
        .map_err(|e| {
            if crate::db::is_unique_violation(&e) {
                ApiError::Conflict("Email or institutional ID already in use".to_string())
            } else {
                ApiError::internal(e, "Failed to update user")
            }
        })?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(admin_id = %admin.id, user_id = %user.id, "User updated");
    Ok(Json(UserResponse::from_db(user)))
}

async fn delete_user(
    Path(user_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, ApiError> {
    if admin.id == user_id {
        return Err(ApiError::BadRequest("You cannot delete your own account".to_string()));
    }

    let recorded_results = repositories::results::count(state.db(), Some(&user_id), None)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check user results"))?;
    if recorded_results > 0 {
        return Err(ApiError::Conflict("User has recorded results".to_string()));
    }

    // Exams authored and results recorded both restrict the delete.
    let deleted = repositories::users::delete_by_id(state.db(), &user_id).await.map_err(|e| {
        if crate::db::is_foreign_key_violation(&e) {
            ApiError::Conflict("User still owns exams or recorded results".to_string())
        } else {
            ApiError::internal(e, "Failed to delete user")
        }
    })?;
    if !deleted {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    tracing::info!(admin_id = %admin.id, user_id = %user_id, "User deleted");
    Ok(Json(MessageResponse::new("User deleted successfully")))
}

async fn update_profile_picture(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<ProfilePictureUpdate>,
) -> Result<Json<UserResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let updated = repositories::users::update(
        state.db(),
        &user.id,
        repositories::users::UpdateUser {
            profile_picture: Some(payload.profile_picture),
            ..Default::default()
        },
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update profile picture"))?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse::from_db(updated)))
}
