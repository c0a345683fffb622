//! Pinecone vector index integration.

pub mod client;
pub mod types;

pub use client::PineconeService;
pub use types::{ChunkMetadata, IndexError, VectorEntry, VectorMatch};
