//! Embedding client abstraction and the Gemini REST adapter.
//!
//! The pipeline embeds chunks in consecutive batches to respect upstream
//! request-size limits. Batches are issued sequentially and results are
//! concatenated in input order, so output vector `i` always corresponds to
//! input text `i`. A failed batch fails the whole call; callers never see
//! partial results.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Provider responded with an unexpected status code.
    #[error("Unexpected embedding response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the provider.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Provider returned a different number of vectors than texts submitted.
    #[error("Embedding count mismatch: sent {expected} texts, got {actual} vectors")]
    CountMismatch {
        /// Number of texts in the batch.
        expected: usize,
        /// Number of vectors returned.
        actual: usize,
    },
    /// A returned vector does not have the configured dimension.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension every vector in the index must have.
        expected: usize,
        /// Dimension of the offending vector.
        actual: usize,
    },
}

impl EmbeddingError {
    /// Whether a retry can reasonably succeed. Batch boundaries make retries
    /// idempotent, so transport errors and 5xx responses are retried.
    fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::UnexpectedStatus { status, .. } => status.is_server_error(),
            _ => false,
        }
    }
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce one embedding vector per supplied text, in input order.
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Number of attempts per batch before giving up.
const MAX_ATTEMPTS: u32 = 3;
/// Base delay for exponential backoff between attempts.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(200);

/// Embedding client backed by the Gemini `batchEmbedContents` endpoint.
pub struct GeminiEmbeddingClient {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) model: String,
    pub(crate) dimension: usize,
    pub(crate) batch_size: usize,
}

impl GeminiEmbeddingClient {
    /// Construct a new client from explicit configuration values.
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        dimension: usize,
        batch_size: usize,
    ) -> Result<Self, EmbeddingError> {
        let client = Client::builder().user_agent("papermind/0.1").build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            dimension,
            batch_size: batch_size.max(1),
        })
    }

    async fn embed_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.request_batch(batch).await {
                Ok(vectors) => return Ok(vectors),
                Err(error) if attempt < MAX_ATTEMPTS && error.is_retryable() => {
                    let delay = RETRY_BASE_DELAY * 2u32.pow(attempt - 1);
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Embedding batch failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(error) => return Err(error),
            }
        }
    }

    async fn request_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let url = format!("{}/models/{}:batchEmbedContents", self.base_url, self.model);
        let requests: Vec<_> = batch
            .iter()
            .map(|text| {
                json!({
                    "model": format!("models/{}", self.model),
                    "content": { "parts": [{ "text": text }] },
                })
            })
            .collect();

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&json!({ "requests": requests }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::UnexpectedStatus { status, body });
        }

        let payload: BatchEmbedResponse = response.json().await?;
        Ok(payload
            .embeddings
            .into_iter()
            .map(|embedding| embedding.values)
            .collect())
    }
}

#[async_trait]
impl EmbeddingClient for GeminiEmbeddingClient {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(
            model = %self.model,
            texts = texts.len(),
            batch_size = self.batch_size,
            "Generating embeddings"
        );

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let embedded = self.embed_batch(batch).await?;
            if embedded.len() != batch.len() {
                return Err(EmbeddingError::CountMismatch {
                    expected: batch.len(),
                    actual: embedded.len(),
                });
            }
            for vector in &embedded {
                if vector.len() != self.dimension {
                    return Err(EmbeddingError::DimensionMismatch {
                        expected: self.dimension,
                        actual: vector.len(),
                    });
                }
            }
            vectors.extend(embedded);
        }
        Ok(vectors)
    }
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}
