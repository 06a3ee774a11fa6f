use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Subject, User};
use crate::db::types::CourseLevel;
use crate::schemas::user::PersonSummary;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubjectCreate {
    #[serde(alias = "subjectName")]
    #[validate(length(min = 1, max = 255, message = "subject_name must be 1-255 characters"))]
    pub(crate) subject_name: String,
    #[serde(alias = "subjectCode")]
    #[validate(length(min = 1, max = 50, message = "subject_code must be 1-50 characters"))]
    pub(crate) subject_code: String,
    #[serde(alias = "courseLevel")]
    pub(crate) course_level: CourseLevel,
    #[serde(default)]
    pub(crate) prerequisite: Option<String>,
    /// Faculty user id or institutional id.
    #[serde(default, alias = "assignedFaculty", alias = "assigned_faculty_id")]
    pub(crate) assigned_faculty: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubjectUpdate {
    #[serde(default, alias = "subjectName")]
    #[validate(length(min = 1, max = 255, message = "subject_name must be 1-255 characters"))]
    pub(crate) subject_name: Option<String>,
    #[serde(default, alias = "subjectCode")]
    #[validate(length(min = 1, max = 50, message = "subject_code must be 1-50 characters"))]
    pub(crate) subject_code: Option<String>,
    #[serde(default, alias = "courseLevel")]
    pub(crate) course_level: Option<CourseLevel>,
    #[serde(default)]
    pub(crate) prerequisite: Option<String>,
    #[serde(default, alias = "assignedFaculty", alias = "assigned_faculty_id")]
    pub(crate) assigned_faculty: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EnrollmentRequest {
    /// Student user id or institutional id.
    #[serde(alias = "studentId")]
    pub(crate) student_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubjectResponse {
    pub(crate) id: String,
    pub(crate) subject_name: String,
    pub(crate) subject_code: String,
    pub(crate) course_level: CourseLevel,
    pub(crate) prerequisite: Option<String>,
    pub(crate) assigned_faculty: Option<PersonSummary>,
    pub(crate) enrolled_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) enrolled_students: Option<Vec<PersonSummary>>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl SubjectResponse {
    pub(crate) fn from_db(subject: Subject, faculty: Option<User>, enrolled_count: i64) -> Self {
        Self {
            id: subject.id,
            subject_name: subject.subject_name,
            subject_code: subject.subject_code,
            course_level: subject.course_level,
            prerequisite: subject.prerequisite,
            assigned_faculty: faculty.map(PersonSummary::from_db),
            enrolled_count,
            enrolled_students: None,
            created_at: format_primitive(subject.created_at),
            updated_at: format_primitive(subject.updated_at),
        }
    }

    pub(crate) fn with_students(mut self, students: Vec<User>) -> Self {
        self.enrolled_count = students.len() as i64;
        self.enrolled_students = Some(students.into_iter().map(PersonSummary::from_db).collect());
        self
    }
}
