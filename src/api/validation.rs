use crate::api::errors::ApiError;
use crate::services::identity;

pub(crate) fn validate_password_len(password: &str, min_len: usize) -> Result<(), ApiError> {
    if password.chars().count() >= min_len {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!("Password must be at least {min_len} characters long")))
    }
}

/// Returns the canonical `2025-XXXXXX` form; `label` names the field in the error.
pub(crate) fn require_institutional_id(value: &str, label: &str) -> Result<String, ApiError> {
    identity::normalize_institutional_id(value).ok_or_else(|| {
        ApiError::BadRequest(format!("{label} must be in format 2025-XXXXXX"))
    })
}

pub(crate) fn require_non_blank(value: &str, message: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ApiError::BadRequest(message.to_string()))
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_length_counts_characters() {
        assert!(validate_password_len("secret", 6).is_ok());
        assert!(validate_password_len("короче", 6).is_ok());
        assert!(validate_password_len("short", 6).is_err());
    }

    #[test]
    fn institutional_ids_are_normalized() {
        assert_eq!(require_institutional_id("123456", "Student ID").unwrap(), "2025-123456");
        let err = require_institutional_id("2024-123456", "Student ID").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(message) if message.starts_with("Student ID")));
    }
}
