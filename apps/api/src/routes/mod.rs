pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::matching::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Matching API
        .route("/api/v1/match", post(handlers::handle_match))
        .route("/api/v1/compare", post(handlers::handle_compare))
        // Operator endpoints
        .route("/debug/datasets", get(handlers::handle_debug_datasets))
        .route("/debug/match", post(handlers::handle_debug_match))
        .route("/admin/refresh", post(handlers::handle_refresh))
        .with_state(state)
}
