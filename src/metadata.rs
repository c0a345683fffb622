//! Document metadata store client (Supabase PostgREST).
//!
//! Two tables back the pipeline: `documents` tracks per-document processing
//! state (`uploaded` → `processing` → `processed`), and `conversations` links
//! a document to its Q&A session. The explicit `processing` state doubles as
//! a per-document ingestion claim: the transition into it is a conditional
//! update, so only one ingestion run can win it at a time.

use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

/// Errors returned while interacting with the metadata store.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid metadata store URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Store responded with an unexpected status code.
    #[error("Unexpected metadata response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from the store.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// An insert that should return its row came back empty.
    #[error("Metadata store returned no row for {0}")]
    MissingRecord(String),
}

/// Processing state of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Bytes are stored; ingestion has not completed.
    Uploaded,
    /// An ingestion run currently holds the claim on this document.
    Processing,
    /// All vectors for the document have been upserted.
    Processed,
}

/// Row of the `documents` table.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentRecord {
    /// Primary key of the document row.
    pub id: i64,
    /// Unique storage name of the document.
    pub filename: String,
    /// Current processing state.
    pub status: DocumentStatus,
}

impl DocumentRecord {
    /// Whether ingestion has completed for this document.
    pub fn is_processed(&self) -> bool {
        self.status == DocumentStatus::Processed
    }
}

/// Lightweight HTTP client for the metadata store.
pub struct MetadataService {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
}

impl MetadataService {
    /// Construct a new client for the given project URL.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, MetadataError> {
        let client = Client::builder().user_agent("papermind/0.1").build()?;
        let base_url = normalize_base_url(base_url).map_err(MetadataError::InvalidUrl)?;
        tracing::debug!(url = %base_url, "Initialized metadata HTTP client");

        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_string(),
        })
    }

    /// Insert a document row in the `uploaded` state and return it.
    pub async fn create_document(&self, filename: &str) -> Result<DocumentRecord, MetadataError> {
        let response = self
            .request(Method::POST, "rest/v1/documents")
            .header("prefer", "return=representation")
            .json(&json!({ "filename": filename, "status": DocumentStatus::Uploaded }))
            .send()
            .await?;

        let rows: Vec<DocumentRecord> = self.parse_rows(response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| MetadataError::MissingRecord(filename.to_string()))
    }

    /// Look up a document row by its storage name.
    pub async fn find_document(
        &self,
        filename: &str,
    ) -> Result<Option<DocumentRecord>, MetadataError> {
        let response = self
            .request(Method::GET, "rest/v1/documents")
            .query(&[("filename", format!("eq.{filename}")), ("select", "*".into())])
            .send()
            .await?;

        let rows: Vec<DocumentRecord> = self.parse_rows(response).await?;
        Ok(rows.into_iter().next())
    }

    /// Attempt to claim the document for ingestion.
    ///
    /// The transition to `processing` is conditional on the current status, so
    /// a concurrent run racing for the same document loses the claim and gets
    /// `false`. A `processed` document may be re-claimed; re-ingestion is an
    /// idempotent upsert.
    pub async fn claim_processing(&self, filename: &str) -> Result<bool, MetadataError> {
        let response = self
            .request(Method::PATCH, "rest/v1/documents")
            .header("prefer", "return=representation")
            .query(&[
                ("filename", format!("eq.{filename}")),
                ("status", "in.(uploaded,processed)".into()),
            ])
            .json(&json!({ "status": DocumentStatus::Processing }))
            .send()
            .await?;

        let rows: Vec<DocumentRecord> = self.parse_rows(response).await?;
        Ok(!rows.is_empty())
    }

    /// Mark a document as fully processed.
    pub async fn mark_processed(&self, filename: &str) -> Result<(), MetadataError> {
        self.set_status(filename, DocumentStatus::Processed).await
    }

    /// Release a processing claim after a failed run so the caller can retry.
    pub async fn release_claim(&self, filename: &str) -> Result<(), MetadataError> {
        self.set_status(filename, DocumentStatus::Uploaded).await
    }

    /// Insert a conversation row linked to the given document.
    pub async fn create_conversation(&self, file_id: i64) -> Result<(), MetadataError> {
        let response = self
            .request(Method::POST, "rest/v1/conversations")
            .json(&json!({ "file_id": file_id }))
            .send()
            .await?;

        if response.status().is_success() {
            tracing::debug!(file_id, "Conversation created");
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = MetadataError::UnexpectedStatus { status, body };
            tracing::error!(file_id, error = %error, "Conversation insert failed");
            Err(error)
        }
    }

    async fn set_status(
        &self,
        filename: &str,
        status: DocumentStatus,
    ) -> Result<(), MetadataError> {
        let response = self
            .request(Method::PATCH, "rest/v1/documents")
            .query(&[("filename", format!("eq.{filename}"))])
            .json(&json!({ "status": status }))
            .send()
            .await?;

        if response.status().is_success() {
            tracing::debug!(filename, status = ?status, "Document status updated");
            Ok(())
        } else {
            let response_status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = MetadataError::UnexpectedStatus {
                status: response_status,
                body,
            };
            tracing::error!(filename, error = %error, "Document status update failed");
            Err(error)
        }
    }

    async fn parse_rows(
        &self,
        response: reqwest::Response,
    ) -> Result<Vec<DocumentRecord>, MetadataError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = MetadataError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Metadata request failed");
            return Err(error);
        }
        Ok(response.json().await?)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        self.client
            .request(method, url)
            .bearer_auth(&self.api_key)
            .header("apikey", &self.api_key)
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    Ok(parsed.to_string().trim_end_matches('/').to_string())
}
