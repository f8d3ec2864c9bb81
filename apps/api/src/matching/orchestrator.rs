//! Match orchestration: resolves the query text, encodes it once, searches
//! the index and turns the top similarity into an ATS score.
//!
//! `MatchOrchestrator` is the process-wide context: it owns the loaded
//! datasets, the matching index and the embedding provider, and is shared
//! through `AppState` as an `Arc`. Reads never take the reload lock.
//!
//! Tables and the fitted index snapshot are published together as one
//! `Arc<Datasets>`, so a reader never pairs a new index with old resumes.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::dataset::{
    load_jobs, load_resumes, DatasetError, JobPosting, Loaded, RecordId, ResumeRecord,
    ResumeTable, RowWarning,
};
use crate::embedding::{truncate_for_encode, EmbeddingError, EmbeddingProvider};
use crate::matching::index::{fingerprint, FitSummary, IndexSnapshot, MatchingIndex};
use crate::matching::similarity::{ats_score, cosine_similarity, MatchLevel};
use crate::matching::skills::extract_skills;
use crate::matching::{MatchError, MatchResult};

const PREVIEW_FIELD_CHARS: usize = 300;

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error("dataset loader task failed: {0}")]
    Worker(String),
}

/// Either literal resume text or a key into the resumes table.
/// Non-blank `text` takes precedence when both are supplied.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchQuery {
    pub text: Option<String>,
    pub key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "key", rename_all = "snake_case")]
pub enum QuerySource {
    Text,
    ResumeKey(RecordId),
}

#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub matches: Vec<MatchResult>,
    /// ATS score of the best match; `None` when nothing is indexed.
    pub ats_score: Option<f32>,
    pub match_level: Option<MatchLevel>,
    pub source: QuerySource,
    /// Skills found in the encoded resume text.
    pub resume_skills: BTreeSet<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompareOutcome {
    pub similarity: f32,
    pub score: f32,
    pub match_level: MatchLevel,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReloadSummary {
    pub jobs_loaded: usize,
    pub jobs_skipped: usize,
    pub resumes_loaded: usize,
    pub resumes_skipped: usize,
    /// False when the job rows were unchanged and re-encoding was skipped.
    pub reencoded: bool,
    pub fit: Option<FitSummary>,
    pub fingerprint: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub rows: usize,
    pub columns: Vec<String>,
    pub skipped: usize,
    pub warnings: Vec<RowWarning>,
    pub preview: Vec<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexSummary {
    pub jobs: usize,
    pub dimension: usize,
    pub provider: String,
    pub fitted_at: Option<DateTime<Utc>>,
    pub fingerprint: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub loaded_at: Option<DateTime<Utc>>,
    pub jobs: TableSummary,
    pub resumes: TableSummary,
    pub index: IndexSummary,
}

/// Loaded tables and the index fitted from them, published as one unit.
struct Datasets {
    jobs: Loaded<JobPosting>,
    resumes: ResumeTable,
    index: Arc<IndexSnapshot>,
    loaded_at: Option<DateTime<Utc>>,
}

pub struct MatchOrchestrator {
    provider: Arc<dyn EmbeddingProvider>,
    index: MatchingIndex,
    datasets: RwLock<Arc<Datasets>>,
    reload_lock: tokio::sync::Mutex<()>,
    max_encode_chars: usize,
}

impl MatchOrchestrator {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, max_encode_chars: usize) -> Self {
        let index = MatchingIndex::new();
        let datasets = Datasets {
            jobs: Loaded::empty(),
            resumes: ResumeTable::empty(),
            index: index.snapshot(),
            loaded_at: None,
        };
        Self {
            provider,
            index,
            datasets: RwLock::new(Arc::new(datasets)),
            reload_lock: tokio::sync::Mutex::new(()),
            max_encode_chars,
        }
    }

    /// The index snapshot readers currently match against.
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        self.datasets.read().index.clone()
    }

    /// Reads both tables from disk and installs them. A load failure leaves the
    /// current datasets and index exactly as they were.
    ///
    /// CSV parsing runs on the blocking pool so a large reload does not stall
    /// the runtime.
    pub async fn reload(
        &self,
        jobs_path: &Path,
        resumes_path: &Path,
        force: bool,
    ) -> Result<ReloadSummary, RefreshError> {
        let jobs_path = jobs_path.to_path_buf();
        let resumes_path = resumes_path.to_path_buf();
        let (jobs, resumes) = tokio::task::spawn_blocking(move || {
            Ok::<_, DatasetError>((load_jobs(&jobs_path)?, load_resumes(&resumes_path)?))
        })
        .await
        .map_err(|e| RefreshError::Worker(e.to_string()))??;

        Ok(self.install(jobs, resumes, force).await?)
    }

    /// Fits the index to `jobs` (unless the rows are unchanged and `force` is
    /// false) and then publishes both tables.
    pub async fn install(
        &self,
        jobs: Loaded<JobPosting>,
        resumes: Loaded<ResumeRecord>,
        force: bool,
    ) -> Result<ReloadSummary, MatchError> {
        let _guard = self.reload_lock.lock().await;

        let new_fingerprint = fingerprint(&jobs.rows, self.provider.name());
        let current = self.index.snapshot();
        let unchanged = current.is_fitted() && current.fingerprint == new_fingerprint;

        let fit = if unchanged && !force {
            info!(fingerprint = %new_fingerprint, "Job rows unchanged, keeping fitted index");
            None
        } else {
            Some(
                self.index
                    .fit(&jobs.rows, self.provider.as_ref(), self.max_encode_chars)
                    .await?,
            )
        };

        let summary = ReloadSummary {
            jobs_loaded: jobs.rows.len(),
            jobs_skipped: jobs.skipped,
            resumes_loaded: resumes.rows.len(),
            resumes_skipped: resumes.skipped,
            reencoded: fit.is_some(),
            fit,
            fingerprint: new_fingerprint,
        };

        let published = Datasets {
            jobs,
            resumes: ResumeTable::new(resumes),
            index: self.index.snapshot(),
            loaded_at: Some(Utc::now()),
        };
        *self.datasets.write() = Arc::new(published);

        Ok(summary)
    }

    /// Ranks indexed jobs against a resume given as text or as a resumes-table key.
    pub async fn match_resume(
        &self,
        query: &MatchQuery,
        top_k: usize,
    ) -> Result<MatchOutcome, MatchError> {
        let started = Instant::now();
        let datasets = self.datasets.read().clone();
        let (text, source) = resolve(&datasets.resumes, query)?;

        let text = truncate_for_encode(&text, self.max_encode_chars);
        let vector = self.provider.encode(text).await?;
        let matches = datasets.index.search(&vector, top_k)?;
        let resume_skills = extract_skills(text);

        let ats_score = matches.first().map(|m| m.score);
        let match_level = ats_score.map(MatchLevel::from_score);

        info!(
            source = ?source,
            top_k,
            returned = matches.len(),
            ats_score = ats_score.unwrap_or_default(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Resume matched"
        );

        Ok(MatchOutcome {
            matches,
            ats_score,
            match_level,
            source,
            resume_skills,
        })
    }

    /// Scores one resume against one job description, outside the index.
    pub async fn compare(
        &self,
        resume_text: &str,
        job_description: &str,
    ) -> Result<CompareOutcome, MatchError> {
        if resume_text.trim().is_empty() || job_description.trim().is_empty() {
            return Err(MatchError::InvalidRequest(
                "both resume_text and job_description are required".to_string(),
            ));
        }

        let texts = [
            truncate_for_encode(resume_text, self.max_encode_chars).to_string(),
            truncate_for_encode(job_description, self.max_encode_chars).to_string(),
        ];
        let vectors = self.provider.encode_batch(&texts).await?;
        let [resume_vec, jd_vec] = vectors.as_slice() else {
            return Err(MatchError::Embedding(EmbeddingError::BadResponse(format!(
                "expected 2 embeddings, got {}",
                vectors.len()
            ))));
        };

        let similarity = cosine_similarity(resume_vec, jd_vec)?;
        let score = ats_score(similarity);
        Ok(CompareOutcome {
            similarity,
            score,
            match_level: MatchLevel::from_score(score),
        })
    }

    /// Row counts, skip tallies and the first `sample` rows of each table.
    pub fn summary(&self, sample: usize) -> DatasetSummary {
        let datasets = self.datasets.read().clone();
        let snapshot = &datasets.index;

        let resumes = datasets.resumes.loaded();
        DatasetSummary {
            loaded_at: datasets.loaded_at,
            jobs: table_summary(&datasets.jobs, sample),
            resumes: table_summary(resumes, sample),
            index: IndexSummary {
                jobs: snapshot.len(),
                dimension: snapshot.dimension,
                provider: snapshot.provider.clone(),
                fitted_at: snapshot.fitted_at,
                fingerprint: snapshot.fingerprint.clone(),
            },
        }
    }
}

fn resolve(resumes: &ResumeTable, query: &MatchQuery) -> Result<(String, QuerySource), MatchError> {
    if let Some(text) = query.text.as_deref().filter(|t| !t.trim().is_empty()) {
        return Ok((text.to_string(), QuerySource::Text));
    }

    let key = query
        .key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| {
            MatchError::InvalidRequest("provide either non-empty `text` or `key`".to_string())
        })?;

    match resumes.get(key) {
        Some(record) => Ok((record.text.clone(), QuerySource::ResumeKey(record.id.clone()))),
        None => {
            warn!(key, "Resume key not found");
            Err(MatchError::ResumeNotFound(key.to_string()))
        }
    }
}

fn table_summary<T: Serialize>(loaded: &Loaded<T>, sample: usize) -> TableSummary {
    TableSummary {
        rows: loaded.rows.len(),
        columns: loaded.columns.clone(),
        skipped: loaded.skipped,
        warnings: loaded.warnings.iter().take(sample).cloned().collect(),
        preview: loaded
            .rows
            .iter()
            .take(sample)
            .map(|row| truncate_strings(serde_json::to_value(row).unwrap_or(Value::Null)))
            .collect(),
    }
}

fn truncate_strings(value: Value) -> Value {
    match value {
        Value::String(s) if s.chars().count() > PREVIEW_FIELD_CHARS => {
            let head: String = s.chars().take(PREVIEW_FIELD_CHARS).collect();
            Value::String(format!("{head}..."))
        }
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, truncate_strings(v)))
                .collect(),
        ),
        other => other,
    }
}
