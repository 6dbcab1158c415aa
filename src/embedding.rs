//! Embedding service abstraction and the Azure OpenAI implementation.
//!
//! Defines the [`EmbeddingService`] trait the index depends on, plus
//! vector utilities for persisting and comparing embeddings:
//! - [`cosine_similarity`]: compute similarity between two embedding vectors
//! - [`vec_to_blob`]: encode a `Vec<f32>` as little-endian bytes for SQLite BLOB storage
//! - [`blob_to_vec`]: decode a SQLite BLOB back into a `Vec<f32>`

use async_trait::async_trait;

use crate::azure::AzureClient;
use crate::config::AzureConfig;
use crate::error::ServiceError;

/// Turns text into vectors.
///
/// Implementations may call out over the network; every call can fail
/// with a [`ServiceError`].
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Returns the model identifier recorded alongside the index.
    fn model_name(&self) -> &str;

    /// Embed a batch of texts, returning one vector per input in the same order.
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ServiceError>;

    /// Embed a single query text.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        self.embed_texts(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::InvalidResponse("empty embedding response".to_string()))
    }
}

/// Embeddings from an Azure OpenAI deployment (e.g. `text-embedding-ada-002`).
///
/// Inputs are sent in batches of `batch_size` texts per request.
pub struct AzureEmbeddings {
    client: AzureClient,
    deployment: String,
    batch_size: usize,
}

impl AzureEmbeddings {
    pub fn new(config: &AzureConfig) -> Result<Self, ServiceError> {
        Ok(Self {
            client: AzureClient::new(config)?,
            deployment: config.embedding_deployment.clone(),
            batch_size: config.batch_size.max(1),
        })
    }
}

#[async_trait]
impl EmbeddingService for AzureEmbeddings {
    fn model_name(&self) -> &str {
        &self.deployment
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ServiceError> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let body = serde_json::json!({ "input": batch });
            let json = self
                .client
                .post_json(&self.deployment, "embeddings", &body)
                .await?;
            let vectors = parse_embedding_response(&json)?;
            if vectors.len() != batch.len() {
                return Err(ServiceError::InvalidResponse(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }
            out.extend(vectors);
        }
        Ok(out)
    }
}

/// Parse an embeddings API response.
///
/// Extracts the `data[].embedding` arrays, ordered by their `index` field.
pub fn parse_embedding_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, ServiceError> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| ServiceError::InvalidResponse("missing data array".to_string()))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (pos, item) in data.iter().enumerate() {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| ServiceError::InvalidResponse("missing embedding".to_string()))?;

        let vec: Vec<f32> = embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(pos);
        indexed.push((index, vec));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// # Example
///
/// ```rust
/// use challenge_mailer::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12); // 3 × 4 bytes
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`, or `0.0` for empty vectors or vectors
/// of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_orders_by_index() {
        let json = serde_json::json!({
            "data": [
                { "index": 1, "embedding": [0.0, 1.0] },
                { "index": 0, "embedding": [1.0, 0.0] }
            ]
        });
        let vecs = parse_embedding_response(&json).unwrap();
        assert_eq!(vecs, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_parse_missing_data() {
        let err = parse_embedding_response(&serde_json::json!({"error": "nope"})).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidResponse(_)));
    }

    #[test]
    fn test_blob_odd_length_ignores_tail() {
        let mut blob = vec_to_blob(&[1.5, -0.25]);
        blob.push(7);
        assert_eq!(blob_to_vec(&blob), vec![1.5, -0.25]);
    }

    #[test]
    fn test_cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_cosine_different_lengths() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
    }
}
