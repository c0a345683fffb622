//! Blob storage client for uploaded PDF documents (Supabase Storage REST).

use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

/// Sentinel object Supabase keeps in otherwise-empty buckets.
const EMPTY_FOLDER_PLACEHOLDER: &str = ".emptyFolderPlaceholder";

/// Errors returned while interacting with blob storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid storage URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Storage responded with an unexpected status code.
    #[error("Unexpected storage response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from storage.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
}

/// Stored document descriptor returned by listings.
#[derive(Debug, Clone, Serialize)]
pub struct StoredFile {
    /// Storage name of the document.
    pub name: String,
    /// Public URL where the document can be retrieved.
    pub url: String,
}

#[derive(Deserialize)]
struct ObjectInfo {
    name: String,
}

/// Lightweight HTTP client for blob storage operations.
pub struct StorageService {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) bucket: String,
}

impl StorageService {
    /// Construct a new client for the given project URL and bucket.
    pub fn new(base_url: &str, api_key: &str, bucket: &str) -> Result<Self, StorageError> {
        let client = Client::builder().user_agent("papermind/0.1").build()?;
        let base_url = normalize_base_url(base_url).map_err(StorageError::InvalidUrl)?;
        tracing::debug!(url = %base_url, bucket, "Initialized storage HTTP client");

        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_string(),
            bucket: bucket.to_string(),
        })
    }

    /// Store raw bytes under the given name.
    pub async fn upload(
        &self,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let response = self
            .request(
                Method::POST,
                &format!("storage/v1/object/{}/{name}", self.bucket),
            )
            .header("content-type", content_type)
            .body(bytes)
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(name, "Object uploaded");
        })
        .await
    }

    /// Fetch the raw bytes stored under the given name.
    pub async fn download(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        let response = self
            .request(
                Method::GET,
                &format!("storage/v1/object/{}/{name}", self.bucket),
            )
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = StorageError::UnexpectedStatus { status, body };
            tracing::error!(name, error = %error, "Object download failed");
            return Err(error);
        }

        Ok(response.bytes().await?.to_vec())
    }

    /// Public URL for a stored object.
    pub fn public_url(&self, name: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{name}",
            self.base_url, self.bucket
        )
    }

    /// List stored documents with their public URLs.
    pub async fn list(&self) -> Result<Vec<StoredFile>, StorageError> {
        let response = self
            .request(
                Method::POST,
                &format!("storage/v1/object/list/{}", self.bucket),
            )
            .json(&json!({
                "prefix": "",
                "limit": 1000,
                "offset": 0,
                "sortBy": { "column": "name", "order": "asc" }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = StorageError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Object listing failed");
            return Err(error);
        }

        let objects: Vec<ObjectInfo> = response.json().await?;
        Ok(objects
            .into_iter()
            .filter(|object| object.name != EMPTY_FOLDER_PLACEHOLDER)
            .map(|object| StoredFile {
                url: self.public_url(&object.name),
                name: object.name,
            })
            .collect())
    }

    /// Remove a stored object by name.
    pub async fn remove(&self, name: &str) -> Result<(), StorageError> {
        let response = self
            .request(
                Method::DELETE,
                &format!("storage/v1/object/{}", self.bucket),
            )
            .json(&json!({ "prefixes": [name] }))
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(name, "Object removed");
        })
        .await
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        self.client
            .request(method, url)
            .bearer_auth(&self.api_key)
            .header("apikey", &self.api_key)
    }

    async fn ensure_success<F>(
        &self,
        response: reqwest::Response,
        on_success: F,
    ) -> Result<(), StorageError>
    where
        F: FnOnce(),
    {
        if response.status().is_success() {
            on_success();
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = StorageError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Storage request failed");
            Err(error)
        }
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    Ok(parsed.to_string().trim_end_matches('/').to_string())
}
