//! HTTP client wrapper for the Pinecone data plane.

use crate::pinecone::types::{
    IndexError, QueryResponse, UpsertResponse, VectorEntry, VectorMatch,
};
use reqwest::{Client, Method};
use serde_json::{Value, json};

/// Lightweight HTTP client for vector index operations.
pub struct PineconeService {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
}

impl PineconeService {
    /// Construct a new client for the given index host.
    pub fn new(host: &str, api_key: &str) -> Result<Self, IndexError> {
        let client = Client::builder().user_agent("papermind/0.1").build()?;
        let base_url = normalize_base_url(host).map_err(IndexError::InvalidUrl)?;
        tracing::debug!(url = %base_url, "Initialized Pinecone HTTP client");

        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_string(),
        })
    }

    /// Upsert vector entries; idempotent by entry identifier.
    pub async fn upsert(&self, entries: &[VectorEntry]) -> Result<usize, IndexError> {
        if entries.is_empty() {
            return Ok(0);
        }

        // Serialize the entries directly instead of via `json!`: routing
        // through `serde_json::Value` widens the f32 values to f64 and
        // distorts their decimal representation on the wire.
        #[derive(serde::Serialize)]
        struct UpsertRequest<'a> {
            vectors: &'a [VectorEntry],
        }

        let response = self
            .request(Method::POST, "vectors/upsert")
            .json(&UpsertRequest { vectors: entries })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = IndexError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Vector upsert failed");
            return Err(error);
        }

        let payload: UpsertResponse = response.json().await?;
        tracing::debug!(upserted = payload.upserted_count, "Vectors upserted");
        Ok(payload.upserted_count)
    }

    /// Similarity search returning at most `top_k` matches ordered by
    /// descending score, with stored metadata included.
    pub async fn query(
        &self,
        vector: Vec<f32>,
        top_k: usize,
        filter: Option<Value>,
    ) -> Result<Vec<VectorMatch>, IndexError> {
        let mut body = json!({
            "vector": vector,
            "topK": top_k,
            "includeMetadata": true,
        });
        if let Some(filter_value) = filter {
            body.as_object_mut()
                .expect("query body should remain an object")
                .insert("filter".into(), filter_value);
        }

        let response = self
            .request(Method::POST, "query")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = IndexError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Vector query failed");
            return Err(error);
        }

        let payload: QueryResponse = response.json().await?;
        debug_assert!(
            payload
                .matches
                .windows(2)
                .all(|pair| pair[0].score >= pair[1].score),
            "index returned matches out of score order"
        );
        Ok(payload.matches)
    }

    /// Remove every entry from the index.
    pub async fn delete_all(&self) -> Result<(), IndexError> {
        self.delete(json!({ "deleteAll": true })).await
    }

    /// Remove the entries with the given identifiers.
    pub async fn delete_ids(&self, ids: &[String]) -> Result<(), IndexError> {
        if ids.is_empty() {
            return Ok(());
        }
        self.delete(json!({ "ids": ids })).await
    }

    /// Remove every entry whose metadata matches the filter.
    pub async fn delete_by_filter(&self, filter: Value) -> Result<(), IndexError> {
        self.delete(json!({ "filter": filter })).await
    }

    async fn delete(&self, body: Value) -> Result<(), IndexError> {
        let response = self
            .request(Method::POST, "vectors/delete")
            .json(&body)
            .send()
            .await?;

        if response.status().is_success() {
            tracing::debug!("Vector delete applied");
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = IndexError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Vector delete failed");
            Err(error)
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        self.client
            .request(method, url)
            .header("Api-Key", &self.api_key)
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    Ok(parsed.to_string().trim_end_matches('/').to_string())
}
