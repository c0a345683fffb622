//! Processing service coordinating the ingestion and query pipelines.

use crate::{
    config::get_config,
    embedding::{EmbeddingClient, GeminiEmbeddingClient},
    extract,
    generation::{FALLBACK_ANSWER, GeminiGenerator, Generator},
    metadata::MetadataService,
    metrics::{MetricsSnapshot, PipelineMetrics},
    pinecone::{ChunkMetadata, PineconeService, VectorEntry},
    processing::{
        chunking::split_text,
        types::{IngestOutcome, ProcessingError, QueryError, UploadOutcome},
    },
    storage::{StorageService, StoredFile},
};
use async_trait::async_trait;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Pipeline parameters resolved once at startup and passed in explicitly so
/// the service is testable without ambient configuration.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PipelineSettings {
    pub(crate) chunk_size: usize,
    pub(crate) chunk_overlap: usize,
    pub(crate) embedding_dimension: usize,
    pub(crate) top_k: usize,
}

/// Coordinates the full pipeline: blob storage, extraction, chunking,
/// embedding, vector index writes, metadata state, and answer generation.
///
/// The service owns long-lived handles to every upstream client so handlers
/// reuse the same connections. Construct it once near process start and share
/// it through an `Arc`.
pub struct ProcessingService {
    storage: StorageService,
    metadata: MetadataService,
    index: PineconeService,
    embedder: Box<dyn EmbeddingClient>,
    generator: Box<dyn Generator>,
    metrics: Arc<PipelineMetrics>,
    settings: PipelineSettings,
}

/// Abstraction over the pipeline used by the HTTP surface.
#[async_trait]
pub trait ProcessingApi: Send + Sync {
    /// Store uploaded bytes under a generated unique name and create the
    /// document's metadata record.
    async fn upload_document(
        &self,
        original_filename: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadOutcome, ProcessingError>;

    /// Run the full ingestion pipeline for a stored document.
    async fn process_document(&self, filename: &str) -> Result<IngestOutcome, ProcessingError>;

    /// Whether ingestion has completed for the named document.
    async fn is_processed(&self, filename: &str) -> Result<bool, ProcessingError>;

    /// Answer a question grounded in previously ingested documents.
    async fn answer_question(&self, question: &str) -> Result<String, QueryError>;

    /// Remove every entry from the vector index.
    async fn delete_all_embeddings(&self) -> Result<(), ProcessingError>;

    /// List stored documents with public URLs.
    async fn list_documents(&self) -> Result<Vec<StoredFile>, ProcessingError>;

    /// Remove a stored document and its indexed vectors.
    async fn remove_document(&self, filename: &str) -> Result<(), ProcessingError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Deterministic vector identifier derived from the document name and chunk
/// position, so re-ingesting a document replaces its vectors in place.
pub fn vector_id(document_name: &str, chunk_index: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(document_name.as_bytes());
    hasher.update(b":");
    hasher.update(chunk_index.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

impl ProcessingService {
    /// Build a new processing service from the loaded configuration.
    pub fn new() -> Self {
        let config = get_config();
        tracing::info!("Initializing upstream service clients");
        let storage = StorageService::new(
            &config.supabase_url,
            &config.supabase_key,
            &config.storage_bucket,
        )
        .expect("Failed to initialize storage client");
        let metadata = MetadataService::new(&config.supabase_url, &config.supabase_key)
            .expect("Failed to initialize metadata client");
        let index = PineconeService::new(&config.pinecone_host, &config.pinecone_api_key)
            .expect("Failed to initialize vector index client");
        let embedder = GeminiEmbeddingClient::new(
            &config.gemini_base_url,
            &config.google_api_key,
            &config.embedding_model,
            config.embedding_dimension,
            config.embed_batch_size,
        )
        .expect("Failed to initialize embedding client");
        let generator = GeminiGenerator::new(
            &config.gemini_base_url,
            &config.google_api_key,
            &config.generation_model,
        )
        .expect("Failed to initialize generation client");
        tracing::info!("Upstream service clients initialized");

        Self::from_parts(
            storage,
            metadata,
            index,
            Box::new(embedder),
            Box::new(generator),
            PipelineSettings {
                chunk_size: config.chunk_size,
                chunk_overlap: config.chunk_overlap,
                embedding_dimension: config.embedding_dimension,
                top_k: config.search_top_k,
            },
        )
    }

    pub(crate) fn from_parts(
        storage: StorageService,
        metadata: MetadataService,
        index: PineconeService,
        embedder: Box<dyn EmbeddingClient>,
        generator: Box<dyn Generator>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            storage,
            metadata,
            index,
            embedder,
            generator,
            metrics: Arc::new(PipelineMetrics::new()),
            settings,
        }
    }

    /// Store uploaded bytes and create the document record.
    pub async fn upload_document(
        &self,
        original_filename: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadOutcome, ProcessingError> {
        let extension = Path::new(original_filename)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let filename = format!("{}{extension}", Uuid::new_v4().simple());

        self.storage
            .upload(&filename, bytes, "application/pdf")
            .await?;
        self.metadata.create_document(&filename).await?;

        tracing::info!(original = original_filename, filename, "Document uploaded");
        Ok(UploadOutcome {
            url: self.storage.public_url(&filename),
            filename,
        })
    }

    /// Run the ingestion pipeline: download, extract, chunk, embed, upsert,
    /// then record the conversation and mark the document processed.
    pub async fn process_document(
        &self,
        filename: &str,
    ) -> Result<IngestOutcome, ProcessingError> {
        let document = self
            .metadata
            .find_document(filename)
            .await?
            .ok_or_else(|| ProcessingError::UnknownDocument(filename.to_string()))?;

        if !self.metadata.claim_processing(filename).await? {
            return Err(ProcessingError::AlreadyProcessing(filename.to_string()));
        }

        let outcome = self.run_ingestion(document.id, filename).await;
        if outcome.is_err()
            && let Err(release_error) = self.metadata.release_claim(filename).await
        {
            tracing::warn!(
                filename,
                error = %release_error,
                "Failed to release processing claim after ingestion error"
            );
        }
        outcome
    }

    async fn run_ingestion(
        &self,
        document_id: i64,
        filename: &str,
    ) -> Result<IngestOutcome, ProcessingError> {
        tracing::info!(filename, "Processing document");

        let bytes = self.storage.download(filename).await?;
        let text = extract::extract_text(&bytes)?;
        let chunks = split_text(&text, self.settings.chunk_size, self.settings.chunk_overlap)?;
        tracing::debug!(
            filename,
            chunks = chunks.len(),
            chunk_size = self.settings.chunk_size,
            overlap = self.settings.chunk_overlap,
            "Document chunked"
        );

        let embeddings = self.embedder.embed(chunks.clone()).await?;
        if embeddings.len() != chunks.len() {
            return Err(ProcessingError::ChunkVectorMismatch {
                chunks: chunks.len(),
                vectors: embeddings.len(),
            });
        }

        let entries: Vec<VectorEntry> = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(chunk_index, (content, values))| VectorEntry {
                id: vector_id(filename, chunk_index),
                values,
                metadata: ChunkMetadata {
                    content,
                    pdf_name: filename.to_string(),
                    chunk_index,
                },
            })
            .collect();

        let chunk_count = entries.len();
        let vectors_upserted = self.index.upsert(&entries).await?;

        self.metadata.create_conversation(document_id).await?;
        self.metadata.mark_processed(filename).await?;

        self.metrics.record_document(chunk_count as u64);
        tracing::info!(
            filename,
            chunks = chunk_count,
            upserted = vectors_upserted,
            "Document indexed"
        );

        Ok(IngestOutcome {
            chunk_count,
            vectors_upserted,
        })
    }

    /// Answer a question from the indexed chunks: embed, retrieve top-k,
    /// assemble context in ranking order, and generate.
    pub async fn answer_question(&self, question: &str) -> Result<String, QueryError> {
        let mut vectors = self.embedder.embed(vec![question.to_string()]).await?;
        let vector = vectors.pop().ok_or(QueryError::EmptyEmbedding)?;

        let expected = self.settings.embedding_dimension;
        if vector.len() != expected {
            return Err(QueryError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }

        let matches = self.index.query(vector, self.settings.top_k, None).await?;
        let context = matches
            .iter()
            .filter_map(|hit| hit.metadata.as_ref().map(|meta| meta.content.as_str()))
            .collect::<Vec<_>>()
            .join("\n");

        if context.is_empty() {
            tracing::debug!("No relevant chunks retrieved; returning fallback answer");
            self.metrics.record_question();
            return Ok(FALLBACK_ANSWER.to_string());
        }

        let answer = self.generator.answer(question, &context).await?;
        self.metrics.record_question();
        tracing::info!(matches = matches.len(), "Question answered");
        Ok(answer)
    }

    /// Whether ingestion has completed, answered from the metadata store.
    pub async fn is_processed(&self, filename: &str) -> Result<bool, ProcessingError> {
        let record = self.metadata.find_document(filename).await?;
        Ok(record.map(|row| row.is_processed()).unwrap_or(false))
    }

    /// Remove every entry from the vector index.
    pub async fn delete_all_embeddings(&self) -> Result<(), ProcessingError> {
        self.index.delete_all().await?;
        tracing::info!("Vector index emptied");
        Ok(())
    }

    /// List stored documents with public URLs.
    pub async fn list_documents(&self) -> Result<Vec<StoredFile>, ProcessingError> {
        Ok(self.storage.list().await?)
    }

    /// Remove a stored document and delete its vectors by metadata filter.
    pub async fn remove_document(&self, filename: &str) -> Result<(), ProcessingError> {
        self.storage.remove(filename).await?;
        self.index
            .delete_by_filter(json!({ "pdf_name": { "$eq": filename } }))
            .await?;
        tracing::info!(filename, "Document removed");
        Ok(())
    }

    /// Return the current pipeline metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl ProcessingApi for ProcessingService {
    async fn upload_document(
        &self,
        original_filename: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadOutcome, ProcessingError> {
        ProcessingService::upload_document(self, original_filename, bytes).await
    }

    async fn process_document(&self, filename: &str) -> Result<IngestOutcome, ProcessingError> {
        ProcessingService::process_document(self, filename).await
    }

    async fn is_processed(&self, filename: &str) -> Result<bool, ProcessingError> {
        ProcessingService::is_processed(self, filename).await
    }

    async fn answer_question(&self, question: &str) -> Result<String, QueryError> {
        ProcessingService::answer_question(self, question).await
    }

    async fn delete_all_embeddings(&self) -> Result<(), ProcessingError> {
        ProcessingService::delete_all_embeddings(self).await
    }

    async fn list_documents(&self) -> Result<Vec<StoredFile>, ProcessingError> {
        ProcessingService::list_documents(self).await
    }

    async fn remove_document(&self, filename: &str) -> Result<(), ProcessingError> {
        ProcessingService::remove_document(self, filename).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        ProcessingService::metrics_snapshot(self)
    }
}
