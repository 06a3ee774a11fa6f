use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentUser, TOKEN_COOKIE};
use crate::api::validation::{require_institutional_id, require_non_blank, validate_password_len};
use crate::core::redis::rate_limit_key;
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::User;
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::auth::{
    ChangePasswordRequest, LoginRequest, RegisterStudentRequest, RegisterTeacherRequest,
    TokenResponse, VerifyAdminRequest, VerifyAdminResponse,
};
use crate::schemas::user::UserResponse;
use crate::schemas::MessageResponse;
use crate::services::identity::{self, LoginHandle};

/// Max attempts per window for login, registration and admin code checks.
const AUTH_RATE_LIMIT: u64 = 10;
/// Rate limit window in seconds.
const AUTH_RATE_WINDOW_SECONDS: u64 = 60;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/register-student", post(register_student))
        .route("/register-teacher", post(register_teacher))
        .route("/me", get(me))
        .route("/change-password", post(change_password))
        .route("/verify-admin", post(verify_admin))
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<TokenResponse>), ApiError> {
    let role = payload.role.unwrap_or(UserRole::Student);
    if role == UserRole::Admin {
        return Err(ApiError::BadRequest(
            "Admin login should use verify-admin endpoint".to_string(),
        ));
    }

    enforce_rate_limit(&state, "login", &payload.identifier, "Too many login attempts, try again later")
        .await?;

    let user = match identity::resolve_login_handle(&payload.identifier, role) {
        LoginHandle::InstitutionalId(id) => {
            repositories::users::find_by_institutional_id(state.db(), &id).await
        }
        LoginHandle::Email(email) => repositories::users::find_by_email(state.db(), &email).await,
    }
    .map_err(|e| ApiError::internal(e, "Failed to load user"))?
    .filter(|user| user.role == role)
    .ok_or(ApiError::Unauthorized("Invalid credentials"))?;

    check_password(&payload.password, &user)?;

    if !user.is_active {
        return Err(ApiError::BadRequest("Inactive user".to_string()));
    }

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "User logged in");
    issue_session(&state, jar, user)
}

async fn logout(jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    (jar.remove(Cookie::build(TOKEN_COOKIE).path("/")), Json(MessageResponse::new("Logged out")))
}

async fn register_student(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<RegisterStudentRequest>,
) -> Result<(StatusCode, CookieJar, Json<TokenResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let student_id = require_institutional_id(&payload.student_id, "Student ID")?;

    let registration = Registration {
        role: UserRole::Student,
        institutional_id: student_id,
        first_name: &payload.first_name,
        last_name: &payload.last_name,
        password: &payload.password,
    };
    register(&state, jar, registration).await
}

async fn register_teacher(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<RegisterTeacherRequest>,
) -> Result<(StatusCode, CookieJar, Json<TokenResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let faculty_id = require_institutional_id(&payload.faculty_id, "Faculty ID")?;

    let registration = Registration {
        role: UserRole::Teacher,
        institutional_id: faculty_id,
        first_name: &payload.first_name,
        last_name: &payload.last_name,
        password: &payload.password,
    };
    register(&state, jar, registration).await
}

struct Registration<'a> {
    role: UserRole,
    institutional_id: String,
    first_name: &'a str,
    last_name: &'a str,
    password: &'a str,
}

async fn register(
    state: &AppState,
    jar: CookieJar,
    registration: Registration<'_>,
) -> Result<(StatusCode, CookieJar, Json<TokenResponse>), ApiError> {
    let first_name = require_non_blank(registration.first_name, "First name is required")?;
    let last_name = require_non_blank(registration.last_name, "Last name is required")?;
    validate_password_len(registration.password, state.settings().security().min_password_length)?;

    enforce_rate_limit(
        state,
        "register",
        &registration.institutional_id,
        "Too many registration attempts, try again later",
    )
    .await?;

    let email = identity::default_email(&registration.institutional_id, registration.role)
        .ok_or_else(|| ApiError::BadRequest("Role cannot self-register".to_string()))?;

    let exists = repositories::users::exists_by_institutional_id_or_email(
        state.db(),
        &registration.institutional_id,
        &email,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to check existing user"))?;
    if exists {
        return Err(ApiError::Conflict("User with this ID already exists".to_string()));
    }

    let hashed_password = security::hash_password(registration.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let user = repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            role: registration.role,
            institutional_id: Some(&registration.institutional_id),
            email: &email,
            hashed_password,
            first_name: &first_name,
            last_name: &last_name,
            is_active: true,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| {
        if crate::db::is_unique_violation(&e) {
            ApiError::Conflict("User with this ID already exists".to_string())
        } else {
            ApiError::internal(e, "Failed to create user")
        }
    })?;

    tracing::info!(
        user_id = %user.id,
        role = user.role.as_str(),
        institutional_id = %registration.institutional_id,
        "User registered"
    );

    let (jar, response) = issue_session(state, jar, user)?;
    Ok((StatusCode::CREATED, jar, response))
}

async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from_db(user))
}

async fn change_password(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let verified = security::verify_password(&payload.current_password, &user.hashed_password)
        .map_err(|e| ApiError::internal(e, "Failed to verify password"))?;
    if !verified {
        return Err(ApiError::BadRequest("Current password is incorrect".to_string()));
    }

    validate_password_len(&payload.new_password, state.settings().security().min_password_length)?;

    let hashed_password = security::hash_password(&payload.new_password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    repositories::users::update(
        state.db(),
        &user.id,
        repositories::users::UpdateUser {
            hashed_password: Some(hashed_password),
            ..Default::default()
        },
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update password"))?;

    tracing::info!(user_id = %user.id, "Password changed");
    Ok(Json(MessageResponse::new("Password updated successfully")))
}

async fn verify_admin(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<VerifyAdminRequest>,
) -> Result<(CookieJar, Json<VerifyAdminResponse>), ApiError> {
    let subject = payload.email.as_deref().unwrap_or("anonymous");
    enforce_rate_limit(&state, "verify-admin", subject, "Too many admin code attempts, try again later")
        .await?;

    let code = payload.admin_code.trim();
    let valid = !code.is_empty()
        && repositories::admin_codes::is_active(state.db(), &security::hash_admin_code(code))
            .await
            .map_err(|e| ApiError::internal(e, "Failed to verify admin code"))?;

    if !valid {
        tracing::warn!("Rejected admin code");
        return Ok((jar, Json(VerifyAdminResponse { valid: false, session: None })));
    }

    let (Some(email), Some(password)) = (payload.email.as_deref(), payload.password.as_deref())
    else {
        return Ok((jar, Json(VerifyAdminResponse { valid: true, session: None })));
    };

    let admin = repositories::users::find_by_email(state.db(), &identity::normalize_email(email))
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?
        .filter(|user| user.role == UserRole::Admin && user.is_active)
        .ok_or(ApiError::Unauthorized("Invalid credentials"))?;

    check_password(password, &admin)?;

    tracing::info!(user_id = %admin.id, "Admin signed in");
    let (jar, Json(session)) = issue_session(&state, jar, admin)?;
    Ok((jar, Json(VerifyAdminResponse { valid: true, session: Some(session) })))
}

async fn enforce_rate_limit(
    state: &AppState,
    scope: &str,
    subject: &str,
    message: &'static str,
) -> Result<(), ApiError> {
    let allowed = state
        .redis()
        .rate_limit(&rate_limit_key(scope, subject), AUTH_RATE_LIMIT, AUTH_RATE_WINDOW_SECONDS)
        .await
        .unwrap_or(true);
    if allowed {
        Ok(())
    } else {
        Err(ApiError::TooManyRequests(message))
    }
}

fn check_password(password: &str, user: &User) -> Result<(), ApiError> {
    let verified = security::verify_password(password, &user.hashed_password)
        .map_err(|_| ApiError::Unauthorized("Invalid credentials"))?;
    if verified {
        Ok(())
    } else {
        Err(ApiError::Unauthorized("Invalid credentials"))
    }
}

fn issue_session(
    state: &AppState,
    jar: CookieJar,
    user: User,
) -> Result<(CookieJar, Json<TokenResponse>), ApiError> {
    let token = security::create_access_token(&user.id, user.role, state.settings(), None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    let cookie = Cookie::build((TOKEN_COOKIE, token.clone()))
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(state.settings().security().cookie_secure)
        .path("/")
        .max_age(security::token_lifetime(state.settings()))
        .build();

    Ok((jar.add(cookie), Json(TokenResponse::bearer(token, UserResponse::from_db(user)))))
}
