//! Document processing pipeline: extraction, chunking, embedding, and index orchestration.

pub mod chunking;
mod service;
pub mod types;

pub use service::{ProcessingApi, ProcessingService, vector_id};
pub use types::{ChunkingError, IngestOutcome, ProcessingError, QueryError, UploadOutcome};
