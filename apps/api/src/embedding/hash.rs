//! FNV-1a feature-hashing embedder: offline, deterministic, no model download.
//!
//! Each lower-cased word contributes a unigram feature (weight 1.0) and its
//! character trigrams (weight 0.5). Features are hashed into `dimension`
//! signed buckets and the result is L2-normalised.

use async_trait::async_trait;

use super::{EmbeddingError, EmbeddingProvider};

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x00000100000001B3;

const WORD_WEIGHT: f32 = 1.0;
const TRIGRAM_WEIGHT: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct HashEmbedder {
    name: String,
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        assert!(dimension > 0, "dimension must be > 0");
        Self {
            name: format!("fnv1a-hash-{dimension}"),
            dimension,
        }
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let lower = text.to_lowercase();

        for word in lower
            .split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#'))
            .filter(|w| !w.is_empty())
        {
            self.add_feature(&mut vector, word.as_bytes(), WORD_WEIGHT);

            let padded: Vec<char> = format!("^{word}$").chars().collect();
            for window in padded.windows(3) {
                let trigram: String = window.iter().collect();
                self.add_feature(&mut vector, trigram.as_bytes(), TRIGRAM_WEIGHT);
            }
        }

        l2_normalize(&mut vector);
        vector
    }

    fn add_feature(&self, vector: &mut [f32], feature: &[u8], weight: f32) {
        let h = fnv1a(feature);
        let bucket = (h % self.dimension as u64) as usize;
        let sign = if (h >> 32) & 1 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    // Microseconds of CPU per text, so this runs inline on the calling task.
    async fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.embed_sync(text))
    }

    /// A full index fit is CPU-bound work proportional to the dataset, so it
    /// moves to the blocking pool.
    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let embedder = self.clone();
        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || {
            texts.iter().map(|text| embedder.embed_sync(text)).collect::<Vec<_>>()
        })
        .await
        .map_err(|e| EmbeddingError::Worker(e.to_string()))
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::similarity::cosine_similarity;

    #[tokio::test]
    async fn test_embedding_is_unit_length() {
        let emb = HashEmbedder::new(64);
        let v = emb.encode("senior rust engineer").await.unwrap();
        assert_eq!(v.len(), 64);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_deterministic() {
        let emb = HashEmbedder::new(128);
        assert_eq!(
            emb.encode("data analyst").await.unwrap(),
            emb.encode("data analyst").await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_case_and_punctuation_insensitive() {
        let emb = HashEmbedder::new(128);
        assert_eq!(
            emb.encode("Python, Django!").await.unwrap(),
            emb.encode("python django").await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_empty_text_is_zero_vector() {
        let emb = HashEmbedder::new(32);
        let v = emb.encode("").await.unwrap();
        assert!(v.iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn test_shared_vocabulary_scores_higher() {
        let emb = HashEmbedder::new(384);
        let query = emb.encode("python django backend developer").await.unwrap();
        let close = emb.encode("backend developer python django postgres").await.unwrap();
        let far = emb.encode("registered nurse intensive care").await.unwrap();

        let close_sim = cosine_similarity(&query, &close).unwrap();
        let far_sim = cosine_similarity(&query, &far).unwrap();
        assert!(close_sim > far_sim, "close={close_sim} far={far_sim}");
    }

    #[tokio::test]
    async fn test_batch_matches_single() {
        let emb = HashEmbedder::new(64);
        let batch = emb
            .encode_batch(&["alpha".to_string(), "beta".to_string()])
            .await
            .unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], emb.encode("alpha").await.unwrap());
        assert_eq!(batch[1], emb.encode("beta").await.unwrap());
    }

    #[test]
    fn test_name_includes_dimension() {
        assert_eq!(HashEmbedder::new(256).name(), "fnv1a-hash-256");
    }
}
