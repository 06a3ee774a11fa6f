pub(crate) mod auth;
pub(crate) mod errors;
pub(crate) mod exams;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod pagination;
pub(crate) mod results;
pub(crate) mod router;
pub(crate) mod students;
pub(crate) mod subjects;
pub(crate) mod users;
pub(crate) mod validation;
