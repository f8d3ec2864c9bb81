mod config;
mod dataset;
mod embedding;
mod errors;
mod matching;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, EmbeddingBackend};
use crate::embedding::{EmbeddingProvider, HashEmbedder, HttpEmbedder};
use crate::matching::MatchOrchestrator;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on invalid env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Matcher API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize embedding provider
    let provider = build_provider(&config)?;
    info!(
        "Embedding provider initialized (model: {}, dim: {})",
        provider.name(),
        provider.dimension()
    );

    // Load datasets and fit the index before accepting traffic
    let matcher = Arc::new(MatchOrchestrator::new(provider, config.max_encode_chars));
    let summary = matcher
        .reload(&config.jobs_csv_path, &config.resumes_csv_path, true)
        .await?;
    info!(
        jobs = summary.jobs_loaded,
        jobs_skipped = summary.jobs_skipped,
        resumes = summary.resumes_loaded,
        resumes_skipped = summary.resumes_skipped,
        "Datasets loaded and index fitted"
    );

    // Build app state
    let state = AppState {
        config: config.clone(),
        matcher,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs the embedding backend selected by `EMBEDDING_PROVIDER`.
fn build_provider(config: &Config) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider: Arc<dyn EmbeddingProvider> = match &config.embedding_backend {
        EmbeddingBackend::Hash => Arc::new(HashEmbedder::new(config.embedding_dim)),
        EmbeddingBackend::Http { url, api_key } => Arc::new(HttpEmbedder::new(
            url.clone(),
            api_key.clone(),
            config.embedding_model.clone(),
            config.embedding_dim,
            config.embedding_batch_size,
            config.embedding_timeout,
        )?),
    };
    Ok(provider)
}
