use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::types::UserRole;
use crate::schemas::user::UserResponse;

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    /// Six digits, a full institutional id, or an email.
    #[serde(alias = "email", alias = "username")]
    pub(crate) identifier: String,
    pub(crate) password: String,
    #[serde(default)]
    pub(crate) role: Option<UserRole>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct RegisterStudentRequest {
    #[serde(alias = "firstName")]
    #[validate(length(min = 1, max = 100, message = "first_name must be 1-100 characters"))]
    pub(crate) first_name: String,
    #[serde(alias = "lastName")]
    #[validate(length(min = 1, max = 100, message = "last_name must be 1-100 characters"))]
    pub(crate) last_name: String,
    #[serde(alias = "studentId")]
    pub(crate) student_id: String,
    pub(crate) password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct RegisterTeacherRequest {
    #[serde(alias = "firstName")]
    #[validate(length(min = 1, max = 100, message = "first_name must be 1-100 characters"))]
    pub(crate) first_name: String,
    #[serde(alias = "lastName")]
    #[validate(length(min = 1, max = 100, message = "last_name must be 1-100 characters"))]
    pub(crate) last_name: String,
    #[serde(alias = "facultyId")]
    pub(crate) faculty_id: String,
    pub(crate) password: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChangePasswordRequest {
    #[serde(alias = "currentPassword")]
    pub(crate) current_password: String,
    #[serde(alias = "newPassword")]
    pub(crate) new_password: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VerifyAdminRequest {
    #[serde(alias = "adminCode")]
    pub(crate) admin_code: String,
    #[serde(default)]
    pub(crate) email: Option<String>,
    #[serde(default)]
    pub(crate) password: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct VerifyAdminResponse {
    pub(crate) valid: bool,
    #[serde(flatten)]
    pub(crate) session: Option<TokenResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TokenResponse {
    pub(crate) access_token: String,
    pub(crate) token_type: String,
    pub(crate) user: UserResponse,
}

impl TokenResponse {
    pub(crate) fn bearer(access_token: String, user: UserResponse) -> Self {
        Self { access_token, token_type: "bearer".to_string(), user }
    }
}
