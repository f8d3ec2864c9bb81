// Semantic matching engine: embedding index over job postings, cosine top-k
// retrieval, the orchestrator that resolves resume text and scores results, and
// keyword skill overlap reported next to each match.
// All model calls go through embedding::EmbeddingProvider.

pub mod handlers;
pub mod index;
pub mod orchestrator;
pub mod similarity;
pub mod skills;

use std::sync::Arc;

use thiserror::Error;

use crate::dataset::JobPosting;
use crate::embedding::EmbeddingError;

pub use orchestrator::{MatchOrchestrator, MatchQuery, RefreshError};
pub use similarity::MatchLevel;

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("resume '{0}' not found")]
    ResumeNotFound(String),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding provider failed: {0}")]
    Embedding(EmbeddingError),
}

impl From<EmbeddingError> for MatchError {
    fn from(err: EmbeddingError) -> Self {
        match err {
            EmbeddingError::DimensionMismatch { expected, actual } => {
                MatchError::DimensionMismatch { expected, actual }
            }
            other => MatchError::Embedding(other),
        }
    }
}

/// One ranked job for a query. `rank` is 1-based.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub job: Arc<JobPosting>,
    pub similarity: f32,
    pub score: f32,
    pub rank: usize,
}
