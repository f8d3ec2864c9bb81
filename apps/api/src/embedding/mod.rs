//! Embedding providers. The one seam between the matcher and whatever model
//! turns text into vectors.
//!
//! The matching index and orchestrator only see `Arc<dyn EmbeddingProvider>`,
//! so the real model can be swapped for the offline `HashEmbedder` or a
//! table-driven test double without touching callers.

use async_trait::async_trait;
use thiserror::Error;

pub mod hash;
pub mod http;

#[cfg(test)]
pub mod testing;

pub use hash::HashEmbedder;
pub use http::HttpEmbedder;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("embedding API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("malformed embedding response: {0}")]
    BadResponse(String),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding worker failed: {0}")]
    Worker(String),
}

/// Text → dense vector. Implementations must be deterministic for identical
/// input and model version, and every vector must have `dimension()` entries.
///
/// No implementation retries internally; failures surface to the caller.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Stable name of the model/configuration. Part of the index fingerprint.
    fn name(&self) -> &str;

    fn dimension(&self) -> usize;

    async fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Encodes several texts. Output order matches input order.
    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.encode(text).await?);
        }
        Ok(vectors)
    }
}

/// Default cap on characters sent to the provider per text.
/// Sentence-transformer models truncate at ~256 tokens anyway.
pub const DEFAULT_MAX_ENCODE_CHARS: usize = 4000;

/// Cuts `text` to at most `max_chars` characters, backing off to the last
/// whitespace so a word is not split. Shorter texts are returned unchanged.
pub fn truncate_for_encode(text: &str, max_chars: usize) -> &str {
    let cut = match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => byte_idx,
        None => return text,
    };
    let head = &text[..cut];
    match head.rfind(char::is_whitespace) {
        Some(pos) if pos > 0 => head[..pos].trim_end(),
        _ => head,
    }
}
