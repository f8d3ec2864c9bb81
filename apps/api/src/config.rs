use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::embedding::DEFAULT_MAX_ENCODE_CHARS;

/// Which embedding backend to construct at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddingBackend {
    /// Offline feature-hashing embedder. No network, fully deterministic.
    Hash,
    /// OpenAI-compatible `/embeddings` endpoint serving a sentence-transformer.
    Http { url: String, api_key: Option<String> },
}

/// Application configuration loaded from environment variables.
/// Every value has a default except `EMBEDDING_API_URL` when the http backend is selected.
#[derive(Debug, Clone)]
pub struct Config {
    pub jobs_csv_path: PathBuf,
    pub resumes_csv_path: PathBuf,
    pub embedding_backend: EmbeddingBackend,
    pub embedding_model: String,
    pub embedding_dim: usize,
    pub embedding_batch_size: usize,
    pub embedding_timeout: Duration,
    pub max_encode_chars: usize,
    pub default_top_k: usize,
    pub max_top_k: usize,
    pub request_timeout: Duration,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let embedding_backend = match env_or("EMBEDDING_PROVIDER", "hash").as_str() {
            "hash" => EmbeddingBackend::Hash,
            "http" => EmbeddingBackend::Http {
                url: require_env("EMBEDDING_API_URL")?,
                api_key: std::env::var("EMBEDDING_API_KEY").ok(),
            },
            other => bail!("EMBEDDING_PROVIDER must be 'hash' or 'http', got '{other}'"),
        };

        let config = Config {
            jobs_csv_path: PathBuf::from(env_or("JOBS_CSV_PATH", "data/jobs.csv")),
            resumes_csv_path: PathBuf::from(env_or("RESUMES_CSV_PATH", "data/resumes.csv")),
            embedding_backend,
            embedding_model: env_or("EMBEDDING_MODEL", "sentence-transformers/all-MiniLM-L6-v2"),
            embedding_dim: parse_env("EMBEDDING_DIM", 384)?,
            embedding_batch_size: parse_env("EMBEDDING_BATCH_SIZE", 64)?,
            embedding_timeout: Duration::from_secs(parse_env("EMBEDDING_TIMEOUT_SECS", 60)?),
            max_encode_chars: parse_env("MAX_ENCODE_CHARS", DEFAULT_MAX_ENCODE_CHARS)?,
            default_top_k: parse_env("DEFAULT_TOP_K", 5)?,
            max_top_k: parse_env("MAX_TOP_K", 50)?,
            request_timeout: Duration::from_secs(parse_env("REQUEST_TIMEOUT_SECS", 30)?),
            port: parse_env("PORT", 8080)?,
            rust_log: env_or("RUST_LOG", "info"),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.embedding_dim == 0 {
            bail!("EMBEDDING_DIM must be greater than zero");
        }
        if self.embedding_batch_size == 0 {
            bail!("EMBEDDING_BATCH_SIZE must be greater than zero");
        }
        if self.default_top_k > self.max_top_k {
            bail!(
                "DEFAULT_TOP_K ({}) must not exceed MAX_TOP_K ({})",
                self.default_top_k,
                self.max_top_k
            );
        }
        Ok(())
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .ok()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

#[cfg(test)]
impl Config {
    /// Defaults identical to an empty environment, for handler and router tests.
    pub fn for_tests() -> Self {
        Config {
            jobs_csv_path: PathBuf::from("data/jobs.csv"),
            resumes_csv_path: PathBuf::from("data/resumes.csv"),
            embedding_backend: EmbeddingBackend::Hash,
            embedding_model: "test".to_string(),
            embedding_dim: 8,
            embedding_batch_size: 64,
            embedding_timeout: Duration::from_secs(5),
            max_encode_chars: DEFAULT_MAX_ENCODE_CHARS,
            default_top_k: 5,
            max_top_k: 50,
            request_timeout: Duration::from_secs(5),
            port: 0,
            rust_log: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_default_above_max() {
        let mut config = Config::for_tests();
        config.default_top_k = 60;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_dimension() {
        let mut config = Config::for_tests();
        config.embedding_dim = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(Config::for_tests().validate().is_ok());
    }
}
