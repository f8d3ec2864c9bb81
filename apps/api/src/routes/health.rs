use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service version and the size of the fitted index.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.matcher.snapshot();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "matcher",
        "index": {
            "fitted": snapshot.is_fitted(),
            "jobs": snapshot.len(),
            "provider": snapshot.provider,
        }
    }))
}
