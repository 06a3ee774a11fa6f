mod attempts;
mod create;
mod list;
mod manage;
mod status;

pub(super) use attempts::start_attempt;
pub(super) use create::create_exam;
pub(super) use list::{list_exam_results, list_exams};
pub(super) use manage::{delete_exam, get_exam, update_exam};
pub(super) use status::{set_status, set_status_by_body};
