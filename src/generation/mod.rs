//! Context-constrained answer generation via the Gemini REST API.
//!
//! The generator receives a question and the newline-joined content of the
//! retrieved chunks. A fixed system instruction constrains the model to answer
//! only from that context; when the context does not contain the answer the
//! model is told to emit [`FALLBACK_ANSWER`] instead of drawing on outside
//! knowledge.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// System instruction pinning the model to the supplied context.
pub const SYSTEM_INSTRUCTION: &str = "You must only answer questions based on the provided context. \
     If the context does not contain the answer, say 'I don't know based on the given context.' \
     Do not use any outside knowledge.";

/// Designated answer when retrieval yields nothing relevant.
pub const FALLBACK_ANSWER: &str = "I don't know based on the given context.";

/// Errors raised while generating an answer.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Provider responded with an unexpected status code.
    #[error("Unexpected generation response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the provider.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Provider returned no candidates or empty candidate text.
    #[error("Generation response contained no answer text")]
    EmptyResponse,
}

/// Interface implemented by generation backends.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce an answer to `question` grounded in `context`.
    async fn answer(&self, question: &str, context: &str) -> Result<String, GenerationError>;
}

/// Generator backed by the Gemini `generateContent` endpoint.
pub struct GeminiGenerator {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) model: String,
}

impl GeminiGenerator {
    /// Construct a new generator from explicit configuration values.
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Result<Self, GenerationError> {
        let client = Client::builder().user_agent("papermind/0.1").build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    async fn answer(&self, question: &str, context: &str) -> Result<String, GenerationError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = json!({
            "systemInstruction": {
                "parts": [{ "text": SYSTEM_INSTRUCTION }]
            },
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": format!("Context: {context}") },
                    { "text": question }
                ]
            }]
        });

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, "Generation request failed");
            return Err(GenerationError::UnexpectedStatus { status, body });
        }

        let payload: GenerateContentResponse = response.json().await?;
        let text = payload
            .candidates
            .into_iter()
            .next()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .filter(|text| !text.is_empty())
            .ok_or(GenerationError::EmptyResponse)?;

        Ok(text)
    }
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}
