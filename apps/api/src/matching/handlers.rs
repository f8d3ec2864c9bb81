use std::collections::BTreeSet;
use std::future::Future;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::matching::orchestrator::{CompareOutcome, DatasetSummary, QuerySource, ReloadSummary};
use crate::matching::skills::{extract_skills, matched_skills, skill_overlap};
use crate::matching::{MatchLevel, MatchQuery, MatchResult};
use crate::state::AppState;

const DESCRIPTION_PREVIEW_CHARS: usize = 800;
const DEFAULT_SAMPLE_ROWS: usize = 3;
const MAX_SAMPLE_ROWS: usize = 20;

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    #[serde(flatten)]
    pub query: MatchQuery,
    pub top_k: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    pub resume_text: String,
    pub job_description: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    pub force: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SampleQuery {
    pub sample: Option<usize>,
}

/// One ranked job as rendered to clients.
#[derive(Debug, Serialize)]
pub struct MatchView {
    pub rank: usize,
    pub job_id: String,
    pub title: String,
    pub company: Option<String>,
    pub category: String,
    pub description: String,
    pub similarity: f32,
    pub score: f32,
    /// Skills shared by the resume and the posting. Informational; does not
    /// affect rank.
    pub matched_skills: Vec<String>,
    pub skill_overlap: f32,
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub matches: Vec<MatchView>,
    pub ats_score: Option<f32>,
    pub match_level: Option<MatchLevel>,
    pub source: QuerySource,
}

impl MatchView {
    fn new(result: &MatchResult, resume_skills: &BTreeSet<String>) -> Self {
        let job = &result.job;
        let job_skills = extract_skills(&job.skills);
        Self {
            rank: result.rank,
            job_id: job.id.to_string(),
            title: job.title.clone(),
            company: job.company.clone(),
            category: job.category.clone(),
            description: preview(&job.display_description(), DESCRIPTION_PREVIEW_CHARS),
            similarity: round_to(result.similarity, 4),
            score: result.score,
            matched_skills: matched_skills(resume_skills, &job_skills),
            skill_overlap: round_to(skill_overlap(resume_skills, &job_skills), 4),
        }
    }
}

/// POST /api/v1/match
pub async fn handle_match(
    State(state): State<AppState>,
    Json(req): Json<MatchRequest>,
) -> Result<Json<MatchResponse>, AppError> {
    let top_k = resolve_top_k(&state, req.top_k)?;
    let outcome = with_deadline(&state, state.matcher.match_resume(&req.query, top_k)).await??;

    Ok(Json(MatchResponse {
        matches: outcome
            .matches
            .iter()
            .map(|m| MatchView::new(m, &outcome.resume_skills))
            .collect(),
        ats_score: outcome.ats_score,
        match_level: outcome.match_level,
        source: outcome.source,
    }))
}

/// POST /api/v1/compare
pub async fn handle_compare(
    State(state): State<AppState>,
    Json(req): Json<CompareRequest>,
) -> Result<Json<CompareOutcome>, AppError> {
    let outcome = with_deadline(
        &state,
        state.matcher.compare(&req.resume_text, &req.job_description),
    )
    .await??;
    Ok(Json(outcome))
}

/// GET /debug/datasets
pub async fn handle_debug_datasets(
    State(state): State<AppState>,
    Query(params): Query<SampleQuery>,
) -> Json<DatasetSummary> {
    let sample = params
        .sample
        .unwrap_or(DEFAULT_SAMPLE_ROWS)
        .min(MAX_SAMPLE_ROWS);
    Json(state.matcher.summary(sample))
}

/// POST /debug/match
/// Same resolution as `/api/v1/match` but returns only the best job.
pub async fn handle_debug_match(
    State(state): State<AppState>,
    Json(query): Json<MatchQuery>,
) -> Result<Json<MatchView>, AppError> {
    let outcome = with_deadline(&state, state.matcher.match_resume(&query, 1)).await??;
    outcome
        .matches
        .first()
        .map(|m| Json(MatchView::new(m, &outcome.resume_skills)))
        .ok_or_else(|| AppError::NotFound("No jobs are indexed".to_string()))
}

/// POST /admin/refresh
/// Re-reads both CSV files and re-fits the index if the job rows changed.
pub async fn handle_refresh(
    State(state): State<AppState>,
    body: Option<Json<RefreshRequest>>,
) -> Result<Json<ReloadSummary>, AppError> {
    let force = body.and_then(|Json(req)| req.force).unwrap_or(false);
    let summary = state
        .matcher
        .reload(
            &state.config.jobs_csv_path,
            &state.config.resumes_csv_path,
            force,
        )
        .await?;
    Ok(Json(summary))
}

fn resolve_top_k(state: &AppState, requested: Option<usize>) -> Result<usize, AppError> {
    match requested {
        None => Ok(state.config.default_top_k),
        Some(0) => Err(AppError::Validation("top_k must be at least 1".to_string())),
        Some(k) if k > state.config.max_top_k => Err(AppError::Validation(format!(
            "top_k must be at most {}",
            state.config.max_top_k
        ))),
        Some(k) => Ok(k),
    }
}

/// Bounds a request by the configured deadline. The outer error is the timeout;
/// the inner result is the operation's own.
async fn with_deadline<T, E, F>(state: &AppState, fut: F) -> Result<Result<T, AppError>, AppError>
where
    F: Future<Output = Result<T, E>>,
    AppError: From<E>,
{
    tokio::time::timeout(state.config.request_timeout, fut)
        .await
        .map(|res| res.map_err(AppError::from))
        .map_err(|_| AppError::Timeout)
}

fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn round_to(value: f32, places: i32) -> f32 {
    let factor = 10f32.powi(places);
    (value * factor).round() / factor
}
