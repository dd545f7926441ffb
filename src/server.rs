//! HTTP API server.
//!
//! Exposes the catalog, recommendation and sync flows as a JSON API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version and time) |
//! | `GET`  | `/api/catalog/resources` | List resources (`type`, `query`, `limit`) |
//! | `GET`  | `/api/catalog/resources/{resource_id}` | Fetch one resource |
//! | `GET`  | `/api/sources` | Recorded catalog sources |
//! | `POST` | `/api/recommend` | Hybrid-ranked recommendations |
//! | `POST` | `/api/mcp/sync` | Sync a remote catalog by base URL |
//!
//! # Error Contract
//!
//! All error responses share one shape:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404),
//! `source_unreachable` (502), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! clients.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use ardf_core::{HybridRanker, ListQuery, Resource, ResourcePage, ResourceStore, Source, StoreError};

use crate::config::Config;
use crate::connector_http::HttpCatalogSource;
use crate::error::SyncError;
use crate::search::{build_ranker, recommend, RecommendRequest, RecommendResponse};
use crate::sqlite_store::SqliteStore;
use crate::sync::SyncCoordinator;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    store: Arc<dyn ResourceStore>,
    ranker: HybridRanker,
    sync: SyncCoordinator,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn ResourceStore>, ranker: HybridRanker) -> Self {
        Self {
            config: Arc::new(config),
            sync: SyncCoordinator::new(store.clone()),
            store,
            ranker,
        }
    }
}

/// Build the API router over `state`.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/catalog/resources", get(handle_list_resources))
        .route(
            "/api/catalog/resources/{resource_id}",
            get(handle_get_resource),
        )
        .route("/api/sources", get(handle_list_sources))
        .route("/api/recommend", post(handle_recommend))
        .route("/api/mcp/sync", post(handle_sync))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server on `[server].bind`.
///
/// Runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let ranker = build_ranker(config)?;
    let store = SqliteStore::open(config).await?;
    let state = AppState::new(config.clone(), Arc::new(store), ranker);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("ARDF API listening on http://{}", bind_addr);
    println!("ARDF API listening on http://{}", bind_addr);

    axum::serve(listener, router(state)).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: message.into(),
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Invalid(msg) => bad_request(msg),
            StoreError::Backend(msg) => {
                error!(error = %msg, "store failure");
                internal(msg)
            }
        }
    }
}

impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Unreachable { .. } => AppError {
                status: StatusCode::BAD_GATEWAY,
                code: "source_unreachable",
                message: err.to_string(),
            },
            SyncError::Store(e) => e.into(),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339(),
    })
}

// ============ Catalog ============

#[derive(Debug, Default, Deserialize)]
struct CatalogParams {
    #[serde(rename = "type")]
    resource_type: Option<String>,
    query: Option<String>,
    limit: Option<usize>,
}

async fn handle_list_resources(
    State(state): State<AppState>,
    Query(params): Query<CatalogParams>,
) -> Result<Json<ResourcePage>, AppError> {
    let page = state
        .store
        .list_resources(&ListQuery {
            resource_type: params.resource_type.filter(|t| !t.trim().is_empty()),
            query: params.query,
            limit: params.limit,
        })
        .await?;
    Ok(Json(page))
}

async fn handle_get_resource(
    State(state): State<AppState>,
    Path(resource_id): Path<String>,
) -> Result<Json<Resource>, AppError> {
    state
        .store
        .find_by_resource_id(&resource_id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(format!("resource not found: {}", resource_id)))
}

#[derive(Serialize)]
struct SourcesResponse {
    sources: Vec<Source>,
}

async fn handle_list_sources(
    State(state): State<AppState>,
) -> Result<Json<SourcesResponse>, AppError> {
    let sources = state.store.list_sources().await?;
    Ok(Json(SourcesResponse { sources }))
}

// ============ POST /api/recommend ============

async fn handle_recommend(
    State(state): State<AppState>,
    Json(request): Json<RecommendRequest>,
) -> Result<Json<RecommendResponse>, AppError> {
    request.validate().map_err(bad_request)?;
    let response = recommend(
        state.store.as_ref(),
        &state.ranker,
        &state.config.ranking,
        &request,
    )
    .await?;
    Ok(Json(response))
}

// ============ POST /api/mcp/sync ============

#[derive(Debug, Deserialize)]
struct SyncRequest {
    #[serde(default)]
    base_url: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    api_key: Option<String>,
}

#[derive(Serialize)]
struct SyncedCounts {
    resources: usize,
    skipped: usize,
}

#[derive(Serialize)]
struct SyncResponse {
    status: &'static str,
    synced: SyncedCounts,
}

async fn handle_sync(
    State(state): State<AppState>,
    Json(request): Json<SyncRequest>,
) -> Result<Json<SyncResponse>, AppError> {
    if request.base_url.trim().is_empty() {
        return Err(bad_request("base_url must not be empty"));
    }

    let source = HttpCatalogSource::new(
        &request.base_url,
        request.label,
        request.api_key,
        crate::ingest::AD_HOC_TIMEOUT_SECS,
    )
    .map_err(|e| bad_request(e.to_string()))?;

    let summary = state.sync.sync(&source).await?;

    Ok(Json(SyncResponse {
        status: "ok",
        synced: SyncedCounts {
            resources: summary.resources_synced,
            skipped: summary.skipped,
        },
    }))
}
