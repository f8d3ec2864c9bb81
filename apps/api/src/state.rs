use std::sync::Arc;

use crate::config::Config;
use crate::matching::MatchOrchestrator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Datasets, matching index and embedding provider. Built once at startup,
    /// re-fitted in place by the admin refresh endpoint.
    pub matcher: Arc<MatchOrchestrator>,
}
