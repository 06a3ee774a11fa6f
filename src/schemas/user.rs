use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::User;
use crate::db::types::UserRole;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AdminUserUpdate {
    #[serde(default, alias = "firstName")]
    #[validate(length(min = 1, max = 100, message = "first_name must be 1-100 characters"))]
    pub(crate) first_name: Option<String>,
    #[serde(default, alias = "lastName")]
    #[validate(length(min = 1, max = 100, message = "last_name must be 1-100 characters"))]
    pub(crate) last_name: Option<String>,
    #[serde(default, alias = "institutionalId", alias = "facultyId", alias = "studentId")]
    pub(crate) institutional_id: Option<String>,
    #[serde(default)]
    #[validate(email(message = "email must be a valid address"))]
    pub(crate) email: Option<String>,
    #[serde(default, alias = "profilePicture")]
    #[validate(length(max = 2048, message = "profile_picture is too long"))]
    pub(crate) profile_picture: Option<String>,
    #[serde(default, alias = "isActive")]
    pub(crate) is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ProfilePictureUpdate {
    #[serde(alias = "profilePicture")]
    #[validate(length(min = 1, max = 2048, message = "profile_picture must be 1-2048 characters"))]
    pub(crate) profile_picture: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct UserResponse {
    pub(crate) id: String,
    pub(crate) role: UserRole,
    pub(crate) institutional_id: Option<String>,
    pub(crate) email: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) full_name: String,
    pub(crate) profile_picture: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl UserResponse {
    pub(crate) fn from_db(user: User) -> Self {
        let full_name = user.full_name();
        Self {
            id: user.id,
            role: user.role,
            institutional_id: user.institutional_id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            full_name,
            profile_picture: user.profile_picture,
            is_active: user.is_active,
            created_at: format_primitive(user.created_at),
            updated_at: format_primitive(user.updated_at),
        }
    }
}

/// Compact view used in rosters and subject listings.
#[derive(Debug, Serialize)]
pub(crate) struct PersonSummary {
    pub(crate) id: String,
    pub(crate) institutional_id: Option<String>,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) email: String,
}

impl PersonSummary {
    pub(crate) fn from_db(user: User) -> Self {
        Self {
            id: user.id,
            institutional_id: user.institutional_id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
        }
    }
}
