//! Table-driven embedding provider for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{EmbeddingError, EmbeddingProvider};

/// Returns the vector registered for an exact text, or `fallback` otherwise.
/// Counts every text it encodes and can be switched into a failing or slow mode.
pub struct StaticEmbedder {
    name: String,
    dimension: usize,
    table: HashMap<String, Vec<f32>>,
    fallback: Vec<f32>,
    encoded: AtomicUsize,
    failing: AtomicBool,
    delay_ms: AtomicU64,
}

impl StaticEmbedder {
    pub fn new(dimension: usize) -> Self {
        let mut fallback = vec![0.0; dimension];
        fallback[0] = 1.0;
        Self {
            name: format!("static-{dimension}"),
            dimension,
            table: HashMap::new(),
            fallback,
            encoded: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            delay_ms: AtomicU64::new(0),
        }
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.table.insert(text.to_string(), vector);
        self
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn encoded(&self) -> usize {
        self.encoded.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every subsequent encode sleeps this long before answering.
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

#[async_trait]
impl EmbeddingProvider for StaticEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let delay_ms = self.delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(EmbeddingError::Api {
                status: 503,
                message: "model unavailable".to_string(),
            });
        }
        self.encoded.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .table
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone()))
    }
}
