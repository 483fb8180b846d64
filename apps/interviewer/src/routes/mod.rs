pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::grading::handlers as grading;
use crate::interview::handlers as interview;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Interview API
        .route("/api/v1/interviews", post(interview::handle_start_interview))
        .route(
            "/api/v1/interviews/:id",
            get(interview::handle_get_interview).delete(interview::handle_end_interview),
        )
        .route(
            "/api/v1/interviews/:id/chat",
            post(interview::handle_chat_turn),
        )
        // Grading API
        .route(
            "/api/v1/grading/transcript",
            post(grading::handle_grade_transcript),
        )
        .with_state(state)
}
