//! JSON HTTP API.
//!
//! Exposes the engine's three operations over HTTP so browser frontends and
//! scripts can drive ingestion and querying.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/process-urls` | Rebuild the knowledge base from a list of URLs |
//! | `POST` | `/process-documents` | Rebuild the knowledge base from uploaded files (multipart) |
//! | `POST` | `/query` | Answer a question from the stored corpus |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! All error responses share one schema:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `store_empty` (400), `internal` (500).
//! Per-source load failures during ingestion are data, not transport errors:
//! they appear in the 200 response body.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! clients.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::engine::Engine;
use crate::models::{IngestReport, RawFile};
use crate::progress::CollectingProgress;
use crate::store::StoreError;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    engine: Arc<Engine>,
}

/// Starts the HTTP server.
///
/// Binds to the address configured in `[server].bind` and serves until the
/// process is terminated.
pub async fn run_server(engine: Arc<Engine>) -> anyhow::Result<()> {
    let bind_addr = engine.config().server.bind.clone();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router(engine).layer(cors);

    tracing::info!(addr = %bind_addr, "server listening");
    println!("Server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the application router. Split out from [`run_server`] so tests
/// can drive the handlers without binding a socket.
pub fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/process-urls", post(handle_process_urls))
        .route("/process-documents", post(handle_process_documents))
        .route("/query", post(handle_query))
        .route("/health", get(handle_health))
        .with_state(AppState { engine })
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`).
    code: String,
    /// Human-readable error message.
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn internal_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

/// Maps pipeline errors to HTTP responses. An uninitialized store is a
/// client-side sequencing mistake, so it gets a 400 with guidance instead
/// of a 500.
fn classify_error(err: anyhow::Error) -> AppError {
    if let Some(StoreError::Uninitialized) = err.downcast_ref::<StoreError>() {
        return AppError {
            status: StatusCode::BAD_REQUEST,
            code: "store_empty".to_string(),
            message: "No documents have been processed yet. \
                      Process URLs or upload documents first."
                .to_string(),
        };
    }
    internal_error(err.to_string())
}

// ============ Ingest responses ============

/// JSON response body shared by both ingest endpoints.
#[derive(Serialize)]
struct ProcessResponse {
    /// `true` when chunks were added to the knowledge base.
    success: bool,
    /// Final status line of the pipeline.
    message: String,
    /// Number of chunks added (0 when nothing was loaded).
    chunks_added: usize,
    /// All status lines emitted while the pipeline ran, in order.
    status_messages: Vec<String>,
    /// Per-source outcomes.
    items: Vec<ItemResult>,
}

#[derive(Serialize)]
struct ItemResult {
    source: String,
    /// Documents extracted from this source, when it loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    documents: Option<usize>,
    /// Load failure, when it did not.
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn process_response(report: IngestReport, progress: &CollectingProgress) -> ProcessResponse {
    let status_messages = progress.lines();
    let message = status_messages.last().cloned().unwrap_or_default();
    let items = report
        .items
        .iter()
        .map(|item| match &item.result {
            Ok(documents) => ItemResult {
                source: item.source.clone(),
                documents: Some(*documents),
                error: None,
            },
            Err(error) => ItemResult {
                source: item.source.clone(),
                documents: None,
                error: Some(error.clone()),
            },
        })
        .collect();

    ProcessResponse {
        success: report.succeeded(),
        message,
        chunks_added: report.chunks_added(),
        status_messages,
        items,
    }
}

// ============ POST /process-urls ============

#[derive(Deserialize)]
struct ProcessUrlsRequest {
    urls: Vec<String>,
}

/// Handler for `POST /process-urls`.
async fn handle_process_urls(
    State(state): State<AppState>,
    Json(request): Json<ProcessUrlsRequest>,
) -> Result<Json<ProcessResponse>, AppError> {
    let urls: Vec<String> = request
        .urls
        .into_iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect();
    if urls.is_empty() {
        return Err(bad_request("urls must not be empty"));
    }

    let progress = CollectingProgress::new();
    let report = state
        .engine
        .ingest_urls(&urls, &progress)
        .await
        .map_err(classify_error)?;

    Ok(Json(process_response(report, &progress)))
}

// ============ POST /process-documents ============

/// Handler for `POST /process-documents`.
///
/// Accepts a multipart form where each part is one file. The part's file
/// name selects the extraction format.
async fn handle_process_documents(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ProcessResponse>, AppError> {
    let mut files: Vec<RawFile> = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("invalid multipart body: {}", e)))?
    {
        let name = field
            .file_name()
            .map(|n| n.to_string())
            .unwrap_or_else(|| field.name().unwrap_or("upload").to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request(format!("failed to read upload {}: {}", name, e)))?;
        files.push(RawFile {
            name,
            bytes: bytes.to_vec(),
        });
    }
    if files.is_empty() {
        return Err(bad_request("no files uploaded"));
    }

    let progress = CollectingProgress::new();
    let report = state
        .engine
        .ingest_files(&files, &progress)
        .await
        .map_err(classify_error)?;

    Ok(Json(process_response(report, &progress)))
}

// ============ POST /query ============

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
}

/// JSON response body for `POST /query`.
#[derive(Serialize)]
struct QueryResponse {
    answer: String,
    /// Distinct sources of the retrieved chunks, one per line, sorted.
    sources: String,
}

/// Handler for `POST /query`.
async fn handle_query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError> {
    let question = request.query.trim();
    if question.is_empty() {
        return Err(bad_request("query must not be empty"));
    }

    let result = state
        .engine
        .query(question)
        .await
        .map_err(classify_error)?;

    Ok(Json(QueryResponse {
        answer: result.answer,
        sources: result.sources,
    }))
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Handler for `GET /health`.
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
