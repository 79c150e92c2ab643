pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::ats::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/analyze_ats", post(handlers::handle_analyze_ats))
        .route("/clear_memory", post(handlers::handle_clear_memory))
        .layer(body_limit)
        .with_state(state)
}
