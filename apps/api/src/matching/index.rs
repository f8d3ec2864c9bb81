//! In-memory matching index: one embedding per job posting.
//!
//! The live state is an immutable `IndexSnapshot` behind an `Arc`. `fit` builds
//! a complete replacement without holding any lock and then swaps the pointer.
//! `search` runs against one snapshot, so a reader sees either the old or the
//! new generation in full.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

use crate::dataset::{JobPosting, RecordId};
use crate::embedding::{truncate_for_encode, EmbeddingError, EmbeddingProvider};
use crate::matching::similarity::{ats_score, cosine_similarity};
use crate::matching::{MatchError, MatchResult};

struct IndexedJob {
    job: Arc<JobPosting>,
    vector: Vec<f32>,
}

/// A complete, immutable generation of the index.
pub struct IndexSnapshot {
    pub fit_id: Option<Uuid>,
    pub fitted_at: Option<DateTime<Utc>>,
    pub provider: String,
    pub dimension: usize,
    pub fingerprint: String,
    entries: Vec<IndexedJob>,
}

impl IndexSnapshot {
    fn empty() -> Self {
        Self {
            fit_id: None,
            fitted_at: None,
            provider: String::new(),
            dimension: 0,
            fingerprint: String::new(),
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_fitted(&self) -> bool {
        self.fit_id.is_some()
    }

    /// Top-`top_k` jobs by cosine similarity to `query`, best first.
    ///
    /// Equal similarities are ordered by ascending job identifier. An empty
    /// snapshot or `top_k == 0` yields an empty result, not an error.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<MatchResult>, MatchError> {
        if top_k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }
        check_vector(query, self.dimension)?;

        let mut scored = self
            .entries
            .iter()
            .map(|entry| cosine_similarity(query, &entry.vector).map(|sim| (sim, entry)))
            .collect::<Result<Vec<(f32, &IndexedJob)>, MatchError>>()?;

        if top_k < scored.len() {
            scored.select_nth_unstable_by(top_k - 1, by_rank);
            scored.truncate(top_k);
        }
        scored.sort_by(by_rank);

        debug!(candidates = self.len(), returned = scored.len(), "Index search");

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(pos, (similarity, entry))| MatchResult {
                job: Arc::clone(&entry.job),
                similarity,
                score: ats_score(similarity),
                rank: pos + 1,
            })
            .collect())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FitSummary {
    pub fit_id: Uuid,
    pub jobs: usize,
    pub duplicates: usize,
    pub dimension: usize,
    pub fingerprint: String,
    pub elapsed_ms: u128,
}

pub struct MatchingIndex {
    current: RwLock<Arc<IndexSnapshot>>,
}

impl Default for MatchingIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchingIndex {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(IndexSnapshot::empty())),
        }
    }

    /// The snapshot currently served to readers.
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        self.current.read().clone()
    }

    /// Encodes every job's canonical text and replaces the index wholesale.
    ///
    /// Duplicate identifiers keep the last row. On any error the previous
    /// snapshot stays in place untouched.
    pub async fn fit(
        &self,
        jobs: &[JobPosting],
        provider: &dyn EmbeddingProvider,
        max_encode_chars: usize,
    ) -> Result<FitSummary, MatchError> {
        let started = Instant::now();
        let (unique, duplicates) = dedupe_last_wins(jobs);
        let dimension = provider.dimension();

        let texts: Vec<String> = unique
            .iter()
            .map(|job| truncate_for_encode(&job.canonical_text(), max_encode_chars).to_string())
            .collect();

        let vectors = if texts.is_empty() {
            Vec::new()
        } else {
            provider.encode_batch(&texts).await?
        };
        if vectors.len() != unique.len() {
            return Err(EmbeddingError::BadResponse(format!(
                "provider returned {} vectors for {} jobs",
                vectors.len(),
                unique.len()
            ))
            .into());
        }
        for vector in &vectors {
            check_vector(vector, dimension)?;
        }

        let entries: Vec<IndexedJob> = unique
            .into_iter()
            .zip(vectors)
            .map(|(job, vector)| IndexedJob {
                job: Arc::new(job.clone()),
                vector,
            })
            .collect();

        let fit_id = Uuid::new_v4();
        let snapshot = IndexSnapshot {
            fit_id: Some(fit_id),
            fitted_at: Some(Utc::now()),
            provider: provider.name().to_string(),
            dimension,
            fingerprint: fingerprint(jobs, provider.name()),
            entries,
        };
        let summary = FitSummary {
            fit_id,
            jobs: snapshot.len(),
            duplicates,
            dimension,
            fingerprint: snapshot.fingerprint.clone(),
            elapsed_ms: started.elapsed().as_millis(),
        };

        *self.current.write() = Arc::new(snapshot);

        info!(
            %fit_id,
            jobs = summary.jobs,
            duplicates,
            dimension,
            elapsed_ms = summary.elapsed_ms as u64,
            "Matching index fitted"
        );
        Ok(summary)
    }
}

/// Descending similarity, then ascending job identifier.
fn by_rank(a: &(f32, &IndexedJob), b: &(f32, &IndexedJob)) -> Ordering {
    b.0.total_cmp(&a.0).then_with(|| a.1.job.id.cmp(&b.1.job.id))
}

/// Vectors must have exactly the index dimension and only finite values.
fn check_vector(vector: &[f32], dimension: usize) -> Result<(), MatchError> {
    if vector.len() != dimension {
        return Err(MatchError::DimensionMismatch {
            expected: dimension,
            actual: vector.len(),
        });
    }
    if vector.iter().any(|x| !x.is_finite()) {
        return Err(
            EmbeddingError::BadResponse("embedding contains non-finite values".to_string()).into(),
        );
    }
    Ok(())
}

fn dedupe_last_wins(jobs: &[JobPosting]) -> (Vec<&JobPosting>, usize) {
    let mut positions: HashMap<&RecordId, usize> = HashMap::with_capacity(jobs.len());
    let mut unique: Vec<&JobPosting> = Vec::with_capacity(jobs.len());
    let mut duplicates = 0;

    for job in jobs {
        match positions.get(&job.id) {
            Some(&pos) => {
                unique[pos] = job;
                duplicates += 1;
            }
            None => {
                positions.insert(&job.id, unique.len());
                unique.push(job);
            }
        }
    }
    (unique, duplicates)
}

/// SHA-256 over provider name, ids and canonical texts, in row order.
/// Equal fingerprints mean a re-fit would produce an identical index.
pub fn fingerprint(jobs: &[JobPosting], provider_name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(provider_name.as_bytes());
    for job in jobs {
        hasher.update(b"\x1e");
        hasher.update(job.id.as_str().as_bytes());
        hasher.update(b"\x1f");
        hasher.update(job.canonical_text().as_bytes());
    }
    format!("{:x}", hasher.finalize())
}
