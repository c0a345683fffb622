//! Shared types used by the Pinecone client.

use reqwest::StatusCode;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Errors returned while interacting with the vector index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid index URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Index responded with an unexpected status code.
    #[error("Unexpected index response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from the index.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
}

/// Metadata stored alongside each vector entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Raw chunk text used to assemble answer context.
    pub content: String,
    /// Storage name of the source document.
    pub pdf_name: String,
    /// Zero-based position of the chunk within its document.
    #[serde(deserialize_with = "deserialize_chunk_index")]
    pub chunk_index: usize,
}

// Pinecone persists numeric metadata as floats and may echo `3.0` for `3`.
fn deserialize_chunk_index<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    Ok(value as usize)
}

/// Vector entry prepared for upsert: identifier, values, and chunk metadata.
#[derive(Debug, Clone, Serialize)]
pub struct VectorEntry {
    /// Unique identifier, deterministic per (document, chunk index).
    pub id: String,
    /// Embedding values; same dimension for every entry in the index.
    pub values: Vec<f32>,
    /// Chunk metadata retrieved alongside similarity matches.
    pub metadata: ChunkMetadata,
}

/// Scored match returned by similarity queries.
#[derive(Debug, Clone, Deserialize)]
pub struct VectorMatch {
    /// Identifier of the matched vector entry.
    pub id: String,
    /// Similarity score reported by the index.
    pub score: f32,
    /// Metadata stored with the entry, present when requested.
    #[serde(default)]
    pub metadata: Option<ChunkMetadata>,
}

#[derive(Deserialize)]
pub(crate) struct QueryResponse {
    #[serde(default)]
    pub(crate) matches: Vec<VectorMatch>,
}

#[derive(Deserialize)]
pub(crate) struct UpsertResponse {
    #[serde(rename = "upsertedCount", default)]
    pub(crate) upserted_count: usize,
}
