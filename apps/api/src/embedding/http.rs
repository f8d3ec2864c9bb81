//! HTTP embedding client for OpenAI-compatible `/embeddings` endpoints
//! (text-embeddings-inference, vLLM, Ollama, hosted APIs).
//!
//! One request per batch chunk, no retries: a failed call is surfaced to the
//! caller immediately and retry policy belongs to whoever triggered the work.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{EmbeddingError, EmbeddingProvider};

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct HttpEmbedder {
    client: Client,
    url: String,
    api_key: Option<String>,
    model: String,
    dimension: usize,
    batch_size: usize,
}

impl HttpEmbedder {
    pub fn new(
        url: String,
        api_key: Option<String>,
        model: String,
        dimension: usize,
        batch_size: usize,
        timeout: Duration,
    ) -> Result<Self, EmbeddingError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            url,
            api_key,
            model,
            dimension,
            batch_size: batch_size.max(1),
        })
    }

    async fn request_chunk(&self, chunk: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let body = EmbeddingRequest {
            model: &self.model,
            input: chunk,
        };

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: EmbeddingResponse = response.json().await?;
        let vectors = order_vectors(parsed, chunk.len(), self.dimension)?;
        debug!(inputs = chunk.len(), model = %self.model, "Embedding call succeeded");
        Ok(vectors)
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbedder {
    fn name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.request_chunk(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| EmbeddingError::BadResponse("no embedding returned".to_string()))
    }

    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            vectors.extend(self.request_chunk(chunk).await?);
        }
        Ok(vectors)
    }
}

/// Puts response items back in input order and checks count and dimension.
fn order_vectors(
    response: EmbeddingResponse,
    expected_count: usize,
    dimension: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if response.data.len() != expected_count {
        return Err(EmbeddingError::BadResponse(format!(
            "expected {expected_count} embeddings, got {}",
            response.data.len()
        )));
    }

    let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected_count];
    for datum in response.data {
        if datum.embedding.len() != dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: dimension,
                actual: datum.embedding.len(),
            });
        }
        let slot = slots.get_mut(datum.index).ok_or_else(|| {
            EmbeddingError::BadResponse(format!("embedding index {} out of range", datum.index))
        })?;
        if slot.replace(datum.embedding).is_some() {
            return Err(EmbeddingError::BadResponse(format!(
                "duplicate embedding index {}",
                datum.index
            )));
        }
    }

    // Count matched and every index was unique and in range, so every slot is filled.
    Ok(slots.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> EmbeddingResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_order_vectors_reorders_by_index() {
        let response = parse(
            r#"{"data":[{"index":1,"embedding":[0.0,1.0]},{"index":0,"embedding":[1.0,0.0]}],"model":"m"}"#,
        );
        let vectors = order_vectors(response, 2, 2).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_order_vectors_rejects_wrong_dimension() {
        let response = parse(r#"{"data":[{"index":0,"embedding":[1.0,0.0,0.0]}]}"#);
        let err = order_vectors(response, 1, 2).unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_order_vectors_rejects_wrong_count() {
        let response = parse(r#"{"data":[{"index":0,"embedding":[1.0]}]}"#);
        let err = order_vectors(response, 2, 1).unwrap_err();
        assert!(matches!(err, EmbeddingError::BadResponse(_)));
    }

    #[test]
    fn test_order_vectors_rejects_duplicate_index() {
        let response = parse(
            r#"{"data":[{"index":0,"embedding":[1.0]},{"index":0,"embedding":[2.0]}]}"#,
        );
        let err = order_vectors(response, 2, 1).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_request_serializes_openai_shape() {
        let input = vec!["hello".to_string()];
        let body = EmbeddingRequest {
            model: "all-MiniLM-L6-v2",
            input: &input,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "all-MiniLM-L6-v2");
        assert_eq!(json["input"][0], "hello");
    }
}
