mod handlers;
mod helpers;
mod queries;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_exam).get(handlers::list_exams))
        .route("/status", post(handlers::set_status_by_body))
        .route(
            "/:exam_id",
            get(handlers::get_exam).put(handlers::update_exam).delete(handlers::delete_exam),
        )
        .route("/:exam_id/status", patch(handlers::set_status))
        .route("/:exam_id/results", get(handlers::list_exam_results))
        .route("/:exam_id/attempts", post(handlers::start_attempt))
}
