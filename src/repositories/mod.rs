pub(crate) mod admin_codes;
pub(crate) mod attempts;
pub(crate) mod enrollments;
pub(crate) mod exams;
pub(crate) mod health;
pub(crate) mod results;
pub(crate) mod subjects;
pub(crate) mod users;
