//! HTTP server for stored projects.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/projects` | Ids of all stored projects |
//! | `GET`  | `/projects/{id}` | Stored project as JSON |
//! | `GET`  | `/projects/{id}/view` | Rendered post viewer page |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "project not found: p1" } }
//! ```
//!
//! Error codes: `not_found` (404), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::get::ProjectResponse;
use crate::resolve::{resolve_post, HttpFetcher, ResourceFetcher};
use crate::store::{open_store, Repository};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    repo: Repository,
    fetcher: Arc<dyn ResourceFetcher>,
    asset_base_url: Arc<str>,
}

impl AppState {
    pub fn new(repo: Repository, fetcher: Arc<dyn ResourceFetcher>, asset_base_url: &str) -> Self {
        Self {
            repo,
            fetcher,
            asset_base_url: Arc::from(asset_base_url),
        }
    }
}

/// Starts the server on `[server].bind`. Runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let repo = Repository::new(open_store(config).await?);
    let fetcher: Arc<dyn ResourceFetcher> = Arc::new(HttpFetcher::new(&config.viewer)?);
    let state = AppState::new(repo, fetcher, &config.viewer.asset_base_url);

    let bind_addr = config.server.bind.clone();
    println!("softcon server listening on http://{}", bind_addr);
    tracing::info!(bind = %bind_addr, "server started");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/projects", get(handle_list_projects))
        .route("/projects/{id}", get(handle_get_project))
        .route("/projects/{id}/view", get(handle_view_project))
        .layer(cors)
        .with_state(state)
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

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn internal(err: anyhow::Error) -> AppError {
    let message = format!("{:#}", err);
    tracing::error!(error = %message, "request failed");
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message,
    }
}

/// A stored project, or a 404 when the store has no document for `id`.
async fn load_project(state: &AppState, id: &str) -> Result<ProjectResponse, AppError> {
    match state.repo.get_project(id).await {
        Ok(Some(stored)) => Ok(stored.into()),
        Ok(None) => Err(not_found(format!("project not found: {}", id))),
        Err(e) => Err(internal(e)),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /projects ============

#[derive(Serialize)]
struct ProjectListResponse {
    ids: Vec<String>,
}

async fn handle_list_projects(
    State(state): State<AppState>,
) -> Result<Json<ProjectListResponse>, AppError> {
    let ids = state.repo.list_project_ids().await.map_err(internal)?;
    Ok(Json(ProjectListResponse { ids }))
}

// ============ GET /projects/{id} ============

async fn handle_get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProjectResponse>, AppError> {
    let project = load_project(&state, &id).await?;
    Ok(Json(project))
}

// ============ GET /projects/{id}/view ============

async fn handle_view_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, AppError> {
    let project = load_project(&state, &id).await?;
    let view = resolve_post(
        &project.record,
        state.fetcher.as_ref(),
        &state.asset_base_url,
    )
    .await;
    Ok(Html(view.render_page()))
}
