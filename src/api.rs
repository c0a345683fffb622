//! HTTP surface: axum router and handlers over the processing pipeline.
//!
//! Handlers are generic over [`ProcessingApi`] so tests can drive the router
//! with a stub pipeline. Validation failures return 400 with a short message;
//! upstream failures are logged with full detail and surface as a generic 500
//! so internal hostnames and error bodies never leak to clients.

use crate::{
    metrics::MetricsSnapshot,
    processing::{ProcessingApi, ProcessingError, QueryError},
    storage::StoredFile,
};
use axum::{
    Json, Router,
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Build the application router over the given pipeline implementation.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: ProcessingApi + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/upload", post(upload::<S>))
        .route("/process-file", post(process_file::<S>))
        .route("/file/is-processed", post(is_processed::<S>))
        .route("/response", post(answer::<S>))
        .route("/delete-embeddings", get(delete_embeddings::<S>))
        .route("/files", get(list_files::<S>))
        .route("/files/remove", delete(remove_file::<S>))
        .route("/files/check-processing", get(check_processing::<S>))
        .route("/metrics", get(metrics::<S>))
        .with_state(service)
}

/// API-level error, mapped onto an HTTP response.
enum ApiError {
    /// Client sent an invalid or incomplete request.
    Validation(String),
    /// The requested operation conflicts with in-flight work.
    Conflict(String),
    /// An upstream dependency failed; detail stays in the logs.
    Upstream(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Conflict(message) => {
                (StatusCode::CONFLICT, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Upstream(detail) => {
                tracing::error!(detail, "Request failed on an upstream dependency");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal error" })),
                )
                    .into_response()
            }
        }
    }
}

impl From<ProcessingError> for ApiError {
    fn from(error: ProcessingError) -> Self {
        match error {
            ProcessingError::UnknownDocument(filename) => {
                ApiError::Validation(format!("Unknown document: {filename}"))
            }
            ProcessingError::AlreadyProcessing(filename) => {
                ApiError::Conflict(format!("Document is already being processed: {filename}"))
            }
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(error: QueryError) -> Self {
        ApiError::Upstream(error.to_string())
    }
}

#[derive(Deserialize)]
struct FilenameRequest {
    filename: Option<String>,
}

#[derive(Deserialize)]
struct QuestionRequest {
    query: Option<String>,
}

#[derive(Deserialize)]
struct RemoveParams {
    path: Option<String>,
}

#[derive(Deserialize)]
struct CheckProcessingParams {
    filename: Option<String>,
}

#[derive(Serialize)]
struct UploadResponse {
    message: &'static str,
    url: String,
    filename: String,
}

#[derive(Serialize)]
struct FileListResponse {
    files: Vec<StoredFile>,
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "response": "OK" }))
}

async fn upload<S: ProcessingApi>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| ApiError::Validation(error.to_string()))?
    {
        if field.name() == Some("file") {
            let original = field
                .file_name()
                .map(str::to_string)
                .unwrap_or_else(|| "document.pdf".to_string());
            let bytes = field
                .bytes()
                .await
                .map_err(|error| ApiError::Validation(error.to_string()))?;
            upload = Some((original, bytes.to_vec()));
        }
    }

    let (original, bytes) =
        upload.ok_or_else(|| ApiError::Validation("No File Provided".to_string()))?;
    let outcome = service.upload_document(&original, bytes).await?;

    Ok(Json(UploadResponse {
        message: "File uploaded successfully",
        url: outcome.url,
        filename: outcome.filename,
    }))
}

async fn process_file<S: ProcessingApi>(
    State(service): State<Arc<S>>,
    Json(request): Json<FilenameRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let filename = request
        .filename
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::Validation("Filename is required".to_string()))?;

    let outcome = service.process_document(&filename).await?;
    Ok(Json(json!({
        "message": "PDF processed",
        "chunks": outcome.chunk_count,
    })))
}

async fn is_processed<S: ProcessingApi>(
    State(service): State<Arc<S>>,
    Json(request): Json<FilenameRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let filename = request
        .filename
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::Validation("Filename is required".to_string()))?;

    let processed = service.is_processed(&filename).await?;
    Ok(Json(json!({ "is_processed": processed })))
}

async fn answer<S: ProcessingApi>(
    State(service): State<Arc<S>>,
    Json(request): Json<QuestionRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let question = request
        .query
        .filter(|text| !text.is_empty())
        .ok_or_else(|| ApiError::Validation("Query is required".to_string()))?;

    let answer = service.answer_question(&question).await?;
    Ok(Json(json!({ "results": answer })))
}

async fn delete_embeddings<S: ProcessingApi>(
    State(service): State<Arc<S>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    service.delete_all_embeddings().await?;
    Ok(Json(json!({ "message": "Embeddings Deleted" })))
}

async fn list_files<S: ProcessingApi>(
    State(service): State<Arc<S>>,
) -> Result<Json<FileListResponse>, ApiError> {
    let files = service.list_documents().await?;
    Ok(Json(FileListResponse { files }))
}

async fn remove_file<S: ProcessingApi>(
    State(service): State<Arc<S>>,
    Query(params): Query<RemoveParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let path = params
        .path
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::Validation("File path is required".to_string()))?;

    service.remove_document(&path).await?;
    Ok(Json(json!({ "message": "File deleted successfully" })))
}

async fn check_processing<S: ProcessingApi>(
    State(service): State<Arc<S>>,
    Query(params): Query<CheckProcessingParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let filename = params
        .filename
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::Validation("Filename is required".to_string()))?;

    let processed = service.is_processed(&filename).await?;
    Ok(Json(json!({ "processed": processed })))
}

async fn metrics<S: ProcessingApi>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot> {
    Json(service.metrics_snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::PipelineMetrics;
    use crate::processing::{IngestOutcome, UploadOutcome};
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    /// Stub pipeline recording calls and returning canned values.
    #[derive(Default)]
    struct StubPipeline {
        uploads: Mutex<Vec<String>>,
        processed_files: Mutex<Vec<String>>,
        removed: Mutex<Vec<String>>,
        questions: Mutex<Vec<String>>,
        fail_processing_with_conflict: bool,
        fail_query: bool,
    }

    #[async_trait]
    impl ProcessingApi for StubPipeline {
        async fn upload_document(
            &self,
            original_filename: &str,
            _bytes: Vec<u8>,
        ) -> Result<UploadOutcome, ProcessingError> {
            self.uploads.lock().await.push(original_filename.to_string());
            Ok(UploadOutcome {
                filename: "abc123.pdf".to_string(),
                url: "https://storage.example/abc123.pdf".to_string(),
            })
        }

        async fn process_document(
            &self,
            filename: &str,
        ) -> Result<IngestOutcome, ProcessingError> {
            if self.fail_processing_with_conflict {
                return Err(ProcessingError::AlreadyProcessing(filename.to_string()));
            }
            self.processed_files.lock().await.push(filename.to_string());
            Ok(IngestOutcome {
                chunk_count: 4,
                vectors_upserted: 4,
            })
        }

        async fn is_processed(&self, filename: &str) -> Result<bool, ProcessingError> {
            Ok(filename == "done.pdf")
        }

        async fn answer_question(&self, question: &str) -> Result<String, QueryError> {
            if self.fail_query {
                return Err(QueryError::EmptyEmbedding);
            }
            self.questions.lock().await.push(question.to_string());
            Ok("grounded answer".to_string())
        }

        async fn delete_all_embeddings(&self) -> Result<(), ProcessingError> {
            Ok(())
        }

        async fn list_documents(&self) -> Result<Vec<StoredFile>, ProcessingError> {
            Ok(vec![StoredFile {
                name: "a.pdf".to_string(),
                url: "https://storage.example/a.pdf".to_string(),
            }])
        }

        async fn remove_document(&self, filename: &str) -> Result<(), ProcessingError> {
            self.removed.lock().await.push(filename.to_string());
            Ok(())
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            PipelineMetrics::new().snapshot()
        }
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("parse JSON body")
    }

    fn router_with(stub: StubPipeline) -> (Router, Arc<StubPipeline>) {
        let service = Arc::new(stub);
        (create_router(Arc::clone(&service)), service)
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (router, _) = router_with(StubPipeline::default());
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "response": "OK" }));
    }

    #[tokio::test]
    async fn upload_accepts_multipart_file_field() {
        let (router, service) = router_with(StubPipeline::default());
        let body = concat!(
            "--X-BOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"file\"; filename=\"paper.pdf\"\r\n",
            "Content-Type: application/pdf\r\n\r\n",
            "%PDF-1.5 fake bytes\r\n",
            "--X-BOUNDARY--\r\n",
        );

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/upload")
                    .header("content-type", "multipart/form-data; boundary=X-BOUNDARY")
                    .body(Body::from(body))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let payload = body_json(response).await;
        assert_eq!(payload["message"], "File uploaded successfully");
        assert_eq!(payload["filename"], "abc123.pdf");
        assert_eq!(service.uploads.lock().await.as_slice(), ["paper.pdf"]);
    }

    #[tokio::test]
    async fn upload_without_file_field_is_rejected() {
        let (router, _) = router_with(StubPipeline::default());
        let body = concat!(
            "--X-BOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"other\"\r\n\r\n",
            "value\r\n",
            "--X-BOUNDARY--\r\n",
        );

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/upload")
                    .header("content-type", "multipart/form-data; boundary=X-BOUNDARY")
                    .body(Body::from(body))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await, json!({ "error": "No File Provided" }));
    }

    #[tokio::test]
    async fn process_file_requires_filename() {
        let (router, _) = router_with(StubPipeline::default());
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/process-file")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{}"#))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Filename is required" })
        );
    }

    #[tokio::test]
    async fn process_file_runs_the_pipeline() {
        let (router, service) = router_with(StubPipeline::default());
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/process-file")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"filename":"doc.pdf"}"#))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let payload = body_json(response).await;
        assert_eq!(payload["message"], "PDF processed");
        assert_eq!(service.processed_files.lock().await.as_slice(), ["doc.pdf"]);
    }

    #[tokio::test]
    async fn concurrent_processing_maps_to_conflict() {
        let (router, _) = router_with(StubPipeline {
            fail_processing_with_conflict: true,
            ..StubPipeline::default()
        });
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/process-file")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"filename":"doc.pdf"}"#))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn is_processed_reflects_pipeline_state() {
        let (router, _) = router_with(StubPipeline::default());
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/file/is-processed")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"filename":"done.pdf"}"#))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "is_processed": true }));
    }

    #[tokio::test]
    async fn answer_returns_generated_text() {
        let (router, service) = router_with(StubPipeline::default());
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/response")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"query":"what is chunking?"}"#))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "results": "grounded answer" })
        );
        assert_eq!(
            service.questions.lock().await.as_slice(),
            ["what is chunking?"]
        );
    }

    #[tokio::test]
    async fn upstream_failures_return_generic_error_body() {
        let (router, _) = router_with(StubPipeline {
            fail_query: true,
            ..StubPipeline::default()
        });
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/response")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"query":"anything"}"#))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await, json!({ "error": "internal error" }));
    }

    #[tokio::test]
    async fn files_listing_includes_urls() {
        let (router, _) = router_with(StubPipeline::default());
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/files")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let payload = body_json(response).await;
        assert_eq!(payload["files"][0]["name"], "a.pdf");
        assert_eq!(payload["files"][0]["url"], "https://storage.example/a.pdf");
    }

    #[tokio::test]
    async fn remove_requires_path_parameter() {
        let (router, _) = router_with(StubPipeline::default());
        let response = router
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/files/remove")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn remove_deletes_the_named_file() {
        let (router, service) = router_with(StubPipeline::default());
        let response = router
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/files/remove?path=old.pdf")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(service.removed.lock().await.as_slice(), ["old.pdf"]);
    }

    #[tokio::test]
    async fn check_processing_uses_query_parameter() {
        let (router, _) = router_with(StubPipeline::default());
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/files/check-processing?filename=pending.pdf")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "processed": false }));
    }

    #[tokio::test]
    async fn delete_embeddings_confirms() {
        let (router, _) = router_with(StubPipeline::default());
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/delete-embeddings")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "message": "Embeddings Deleted" })
        );
    }

    #[tokio::test]
    async fn metrics_endpoint_serializes_snapshot() {
        let (router, _) = router_with(StubPipeline::default());
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let payload = body_json(response).await;
        assert_eq!(payload["documents_processed"], 0);
    }
}
