pub(crate) mod attempt_timing;
pub(crate) mod exam_content;
pub(crate) mod exam_lifecycle;
pub(crate) mod grading;
pub(crate) mod identity;
pub(crate) mod taking_session;
