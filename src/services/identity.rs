use crate::db::types::UserRole;

pub(crate) const INSTITUTIONAL_ID_PREFIX: &str = "2025-";
const INSTITUTIONAL_DIGITS: usize = 6;

/// How a login identifier should be looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LoginHandle {
    InstitutionalId(String),
    Email(String),
}

fn is_six_digits(value: &str) -> bool {
    value.len() == INSTITUTIONAL_DIGITS && value.bytes().all(|byte| byte.is_ascii_digit())
}

pub(crate) fn is_institutional_id(value: &str) -> bool {
    value.strip_prefix(INSTITUTIONAL_ID_PREFIX).is_some_and(is_six_digits)
}

/// Accepts `2025-XXXXXX` or the bare six digits.
pub(crate) fn normalize_institutional_id(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if is_six_digits(trimmed) {
        return Some(format!("{INSTITUTIONAL_ID_PREFIX}{trimmed}"));
    }
    is_institutional_id(trimmed).then(|| trimmed.to_string())
}

pub(crate) fn email_domain(role: UserRole) -> Option<&'static str> {
    match role {
        UserRole::Student => Some("student.edu"),
        UserRole::Teacher => Some("teacher.edu"),
        UserRole::Admin => None,
    }
}

pub(crate) fn default_email(institutional_id: &str, role: UserRole) -> Option<String> {
    email_domain(role).map(|domain| format!("{institutional_id}@{domain}"))
}

pub(crate) fn normalize_email(value: &str) -> String {
    value.trim().to_ascii_lowercase()
}

/// Six digits or a full institutional id select the id lookup; anything else is an email,
/// completed with the role's domain when no `@` is present.
pub(crate) fn resolve_login_handle(identifier: &str, role: UserRole) -> LoginHandle {
    if let Some(id) = normalize_institutional_id(identifier) {
        return LoginHandle::InstitutionalId(id);
    }

    let email = normalize_email(identifier);
    if email.contains('@') {
        return LoginHandle::Email(email);
    }

    match email_domain(role) {
        Some(domain) => LoginHandle::Email(format!("{email}@{domain}")),
        None => LoginHandle::Email(email),
    }
}
