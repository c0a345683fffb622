//! Core data types and error definitions for the processing pipeline.

use crate::embedding::EmbeddingError;
use crate::extract::ExtractionError;
use crate::generation::GenerationError;
use crate::metadata::MetadataError;
use crate::pinecone::IndexError;
use crate::storage::StorageError;
use thiserror::Error;

/// Errors produced while splitting text into bounded chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Splitting was configured with an impossible character budget.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
}

/// Errors emitted by the document ingestion pipeline.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// No metadata record exists for the requested document.
    #[error("Unknown document: {0}")]
    UnknownDocument(String),
    /// Another ingestion run currently holds the processing claim.
    #[error("Document is already being processed: {0}")]
    AlreadyProcessing(String),
    /// Blob storage interaction failed.
    #[error("Storage request failed: {0}")]
    Storage(#[from] StorageError),
    /// Metadata store interaction failed.
    #[error("Metadata request failed: {0}")]
    Metadata(#[from] MetadataError),
    /// Document bytes could not be turned into text.
    #[error("Failed to extract document text: {0}")]
    Extraction(#[from] ExtractionError),
    /// Chunking step failed to segment the document.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// Embedding provider failed to produce vectors for the chunks.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingError),
    /// Vector index interaction failed during ingestion.
    #[error("Vector index request failed: {0}")]
    Index(#[from] IndexError),
    /// Chunk and vector counts diverged, violating the one-vector-per-chunk rule.
    #[error("Embedding count mismatch: {chunks} chunks produced {vectors} vectors")]
    ChunkVectorMismatch {
        /// Number of chunks submitted for embedding.
        chunks: usize,
        /// Number of vectors returned by the provider.
        vectors: usize,
    },
}

/// Errors emitted while answering a question.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Embedding provider failed to return a vector for the question.
    #[error("Failed to embed question: {0}")]
    Embedding(#[from] EmbeddingError),
    /// Embedding provider returned no vectors for the question.
    #[error("Embedding provider returned no vectors for the question")]
    EmptyEmbedding,
    /// Returned embedding dimension does not match configuration.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected embedding dimension configured on the server.
        expected: usize,
        /// Actual embedding dimension produced by the provider.
        actual: usize,
    },
    /// Vector index similarity search failed.
    #[error("Vector index request failed: {0}")]
    Index(#[from] IndexError),
    /// Answer generation failed upstream.
    #[error("Failed to generate answer: {0}")]
    Generation(#[from] GenerationError),
}

/// Summary of a completed ingestion run.
#[derive(Debug, Clone, Copy)]
pub struct IngestOutcome {
    /// Number of chunks produced for the document.
    pub chunk_count: usize,
    /// Number of vector entries upserted into the index.
    pub vectors_upserted: usize,
}

/// Result of storing an uploaded document.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    /// Generated unique storage name for the document.
    pub filename: String,
    /// Public URL where the stored bytes can be retrieved.
    pub url: String,
}
