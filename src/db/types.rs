use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "userrole", rename_all = "lowercase")]
pub(crate) enum UserRole {
    Admin,
    Teacher,
    Student,
}

impl UserRole {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Teacher => "teacher",
            Self::Student => "student",
        }
    }

    pub(crate) fn is_staff(self) -> bool {
        matches!(self, Self::Admin | Self::Teacher)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "examstatus", rename_all = "lowercase")]
pub(crate) enum ExamStatus {
    Draft,
    Published,
    Closed,
}

impl ExamStatus {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Closed => "closed",
        }
    }

    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "draft" => Some(Self::Draft),
            "published" => Some(Self::Published),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

impl fmt::Display for ExamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "attemptstatus", rename_all = "lowercase")]
pub(crate) enum AttemptStatus {
    Active,
    Submitted,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "courselevel")]
pub(crate) enum CourseLevel {
    #[serde(rename = "1st Year")]
    #[sqlx(rename = "1st Year")]
    First,
    #[serde(rename = "2nd Year")]
    #[sqlx(rename = "2nd Year")]
    Second,
    #[serde(rename = "3rd Year")]
    #[sqlx(rename = "3rd Year")]
    Third,
    #[serde(rename = "4th Year")]
    #[sqlx(rename = "4th Year")]
    Fourth,
}

/// Stored inside the exam's questions document, so it has no database enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub(crate) enum QuestionType {
    #[default]
    #[serde(rename = "multiple-choice")]
    MultipleChoice,
    #[serde(rename = "text-based")]
    TextBased,
    #[serde(rename = "coding")]
    Coding,
}
