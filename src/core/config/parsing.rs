use std::env;
use std::str::FromStr;

use super::types::{ConfigError, Environment};

/// Local frontends used while developing the exam client.
const DEV_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://127.0.0.1:3000",
    "http://localhost:5173",
    "http://127.0.0.1:5173",
];

pub(super) fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

pub(super) fn env_or_default(key: &str, default: &str) -> String {
    env_optional(key).unwrap_or_else(|| default.to_string())
}

pub(super) fn env_flag(key: &str) -> bool {
    env_optional(key).is_some_and(|value| parse_bool(&value))
}

/// Reads `key` as a number, falling back to `default` when unset or blank.
pub(super) fn env_number<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env_optional(key) {
        Some(value) => parse_number(key, value),
        None => Ok(default),
    }
}

pub(super) fn parse_number<T: FromStr>(field: &'static str, value: String) -> Result<T, ConfigError> {
    value.parse::<T>().map_err(|_| ConfigError::InvalidValue { field, value })
}

/// Accepts a JSON array or a comma-separated list. Trailing slashes are dropped since browsers
/// never send them in `Origin`; an empty list means the development origins.
pub(super) fn parse_cors_origins(value: Option<String>) -> Result<Vec<String>, ConfigError> {
    let raw = value.unwrap_or_default();
    let raw = raw.trim();

    let listed: Vec<String> = if raw.starts_with('[') {
        serde_json::from_str(raw).map_err(|_| ConfigError::InvalidCors(raw.to_string()))?
    } else {
        raw.split(',').map(str::to_string).collect()
    };

    let mut origins: Vec<String> = Vec::with_capacity(listed.len());
    for origin in listed {
        let origin = origin.trim().trim_end_matches('/');
        if !origin.is_empty() && !origins.iter().any(|known| known == origin) {
            origins.push(origin.to_string());
        }
    }

    if origins.is_empty() {
        return Ok(DEV_ORIGINS.iter().map(|origin| origin.to_string()).collect());
    }
    Ok(origins)
}

pub(super) fn parse_bool(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

pub(super) fn parse_environment(value: Option<String>) -> Environment {
    match value.map(|item| item.to_ascii_lowercase()).as_deref() {
        Some("production" | "prod") => Environment::Production,
        Some("staging") => Environment::Staging,
        Some("test" | "testing") => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_accepts_json_and_csv() {
        let from_json = parse_cors_origins(Some(r#"["https://exams.example.edu"]"#.to_string()))
            .expect("json list");
        let from_csv =
            parse_cors_origins(Some(" https://exams.example.edu ,".to_string())).expect("csv list");
        assert_eq!(from_json, vec!["https://exams.example.edu".to_string()]);
        assert_eq!(from_csv, from_json);
    }

    #[test]
    fn cors_origins_are_trimmed_and_deduplicated() {
        let origins = parse_cors_origins(Some(
            "https://exams.example.edu/, https://exams.example.edu, http://localhost:5173/".to_string(),
        ))
        .expect("origins");
        assert_eq!(origins, vec!["https://exams.example.edu", "http://localhost:5173"]);
    }

    #[test]
    fn cors_falls_back_to_dev_origins() {
        for raw in [None, Some(" ".to_string()), Some("[]".to_string()), Some(",,".to_string())] {
            assert_eq!(parse_cors_origins(raw).expect("defaults").len(), DEV_ORIGINS.len());
        }
        assert!(parse_cors_origins(Some("[\"http://a\"".to_string())).is_err());
    }

    #[test]
    fn bool_flags_are_case_insensitive() {
        for truthy in ["1", "true", "TRUE", "Yes", "on"] {
            assert!(parse_bool(truthy), "{truthy}");
        }
        for falsy in ["0", "false", "off", "enabled"] {
            assert!(!parse_bool(falsy), "{falsy}");
        }
    }

    #[test]
    fn environment_aliases() {
        assert_eq!(parse_environment(Some("PROD".to_string())), Environment::Production);
        assert_eq!(parse_environment(Some("staging".to_string())), Environment::Staging);
        assert_eq!(parse_environment(Some("testing".to_string())), Environment::Test);
        assert_eq!(parse_environment(Some("qa".to_string())), Environment::Development);
        assert_eq!(parse_environment(None), Environment::Development);
    }

    #[test]
    fn numbers_report_the_offending_variable() {
        let err = parse_number::<u64>("SUBMIT_GRACE_PERIOD_SECONDS", "soon".to_string()).unwrap_err();
        assert_eq!(err.to_string(), "invalid value for SUBMIT_GRACE_PERIOD_SECONDS: soon");
        assert_eq!(parse_number::<usize>("MIN_PASSWORD_LENGTH", "8".to_string()).expect("usize"), 8);
        assert!(parse_number::<u16>("REDIS_PORT", "70000".to_string()).is_err());
    }
}
