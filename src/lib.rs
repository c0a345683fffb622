#![deny(missing_docs)]

//! Core library for the Papermind PDF question-answering server.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and the Gemini adapter.
pub mod embedding;
/// PDF text extraction and whitespace normalization.
pub mod extract;
/// Context-constrained answer generation.
pub mod generation;
/// Structured logging and tracing setup.
pub mod logging;
/// Document metadata store integration (Supabase PostgREST).
pub mod metadata;
/// Ingestion and query metrics helpers.
pub mod metrics;
/// Pinecone vector index integration.
pub mod pinecone;
/// Document processing pipeline utilities.
pub mod processing;
/// Blob storage integration (Supabase Storage).
pub mod storage;
