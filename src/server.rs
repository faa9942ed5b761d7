//! Catalog HTTP server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Health check |
//! | `POST` | `/upload` | Import a spreadsheet (multipart field `file`) |
//! | `GET`  | `/search?column=..&text=..` | Substring search on one column |
//! | `GET`  | `/stats` | Store existence and record count |
//! | `GET`  | `/export` | Every record as a JSON array |
//!
//! # Error Contract
//!
//! ```json
//! { "error": "חסרים פרמטרים לחיפוש" }
//! ```
//!
//! Missing file, missing search parameters, empty store, and unknown
//! search column are `400`; parse and storage failures are `500`.
//!
//! Every request opens its own store connection; nothing is cached
//! between requests.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the browser
//! front-end can be served from anywhere.

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::Config;
use crate::error::CatalogError;
use crate::export;
use crate::ingest;
use crate::models::{CatalogRecord, SearchHit, Stats};
use crate::search;
use crate::stats;

const SERVICE_NAME: &str = "Ayal Kore Catalog API";

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
}

/// Build the application router for `config`.
pub fn router(config: Arc<Config>) -> Router {
    let body_limit = config.upload.max_bytes;
    let state = AppState { config };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_index))
        .route("/upload", post(handle_upload))
        .route("/search", get(handle_search))
        .route("/stats", get(handle_stats))
        .route("/export", get(handle_export))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Starts the catalog HTTP server.
///
/// Binds to `[server].bind` and serves until the process is terminated.
/// The store is created lazily by the first upload.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = router(Arc::new(config.clone()));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(bind = %bind_addr, db = %config.db.path.display(), "catalog server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            error!(error = %err, "request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };
        AppError {
            status,
            message: err.to_string(),
        }
    }
}

// ============ GET / ============

#[derive(Serialize)]
struct IndexResponse {
    status: &'static str,
    message: &'static str,
}

async fn handle_index() -> Json<IndexResponse> {
    Json(IndexResponse {
        status: "running",
        message: SERVICE_NAME,
    })
}

// ============ POST /upload ============

#[derive(Serialize)]
struct UploadResponse {
    success: bool,
    added: u64,
    skipped: u64,
    total: i64,
}

/// Handler for `POST /upload`.
///
/// Reads the multipart field `file` and runs ingestion over it. A request
/// that is not multipart, lacks the field, or names no file is a `400`.
async fn handle_upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let mut multipart = multipart.map_err(|_| AppError::from(CatalogError::NoFileProvided))?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| AppError {
        status: e.status(),
        message: e.body_text(),
    })? {
        if field.name() != Some("file") {
            continue;
        }
        let named = field.file_name().is_some_and(|n| !n.is_empty());
        if !named {
            return Err(CatalogError::NoFileProvided.into());
        }
        let bytes = field.bytes().await.map_err(|e| AppError {
            status: e.status(),
            message: e.body_text(),
        })?;
        upload = Some(bytes);
        break;
    }

    let bytes = upload.ok_or(CatalogError::NoFileProvided)?;
    let report = ingest::ingest_upload(&state.config, &bytes).await?;

    Ok(Json(UploadResponse {
        success: true,
        added: report.added,
        skipped: report.skipped,
        total: report.total,
    }))
}

// ============ GET /search ============

#[derive(Deserialize)]
struct SearchParams {
    column: Option<String>,
    text: Option<String>,
}

#[derive(Serialize)]
struct SearchResponse {
    success: bool,
    results: Vec<SearchHit>,
    count: usize,
}

async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, AppError> {
    let results = search::search_catalog(
        &state.config,
        params.column.as_deref(),
        params.text.as_deref(),
    )
    .await?;

    Ok(Json(SearchResponse {
        success: true,
        count: results.len(),
        results,
    }))
}

// ============ GET /stats ============

async fn handle_stats(State(state): State<AppState>) -> Result<Json<Stats>, AppError> {
    Ok(Json(stats::catalog_stats(&state.config).await?))
}

// ============ GET /export ============

async fn handle_export(
    State(state): State<AppState>,
) -> Result<Json<Vec<CatalogRecord>>, AppError> {
    Ok(Json(export::export_records(&state.config).await?))
}
