//! HTTP surface for the block and the mobile handlers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/block?courseid=&cmid=&userid=` | Rendered block content |
//! | `POST` | `/mobile/{method}` | Mobile handler (`mobile_view`, `mobile_main_menu_view`) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "userid is required" } }
//! ```
//!
//! Error codes: `bad_request` (400, including malformed query strings and
//! JSON bodies), `not_found` (404). Remote API failures
//! are never errors here; they render as fallback annotations.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{Config, FetchConfig};
use crate::fetch::AnnotationFetcher;
use crate::mobile::{self, MobileArgs, MobileContent, MobileMethod};
use crate::render::{render_block, BlockContent};

/// Shared state handed to every route handler.
#[derive(Clone)]
struct AppState {
    title: Arc<str>,
    fetch_config: Arc<FetchConfig>,
    fetcher: AnnotationFetcher,
}

/// Start the server on `[server].bind` with an HTTP source and in-memory cache.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    run_server_with_fetcher(config, AnnotationFetcher::with_defaults()).await
}

/// Start the server with a caller-supplied fetcher (custom cache or source).
pub async fn run_server_with_fetcher(
    config: &Config,
    fetcher: AnnotationFetcher,
) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = router(config, fetcher);

    tracing::info!(
        bind = %bind_addr,
        api_url = %config.api.url,
        "annotation server listening"
    );

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the router without binding.
pub fn router(config: &Config, fetcher: AnnotationFetcher) -> Router {
    let state = AppState {
        title: Arc::from(config.block_title()),
        fetch_config: Arc::new(config.fetch_config()),
        fetcher,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/block", get(handle_block))
        .route("/mobile/{method}", post(handle_mobile))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
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

// ============ GET /block ============

async fn handle_block(
    State(state): State<AppState>,
    args: Result<Query<MobileArgs>, QueryRejection>,
) -> Result<Json<BlockContent>, AppError> {
    let Query(args) = args.map_err(|e| bad_request(e.body_text()))?;
    let context = args.context().map_err(|e| bad_request(e.to_string()))?;
    let annotations = state.fetcher.fetch(&context, &state.fetch_config).await;
    Ok(Json(render_block(&state.title, &annotations)))
}

// ============ POST /mobile/{method} ============

async fn handle_mobile(
    State(state): State<AppState>,
    Path(method): Path<String>,
    args: Result<Json<MobileArgs>, JsonRejection>,
) -> Result<Json<MobileContent>, AppError> {
    let method: MobileMethod = method
        .parse()
        .map_err(|e: anyhow::Error| not_found(e.to_string()))?;
    let Json(args) = args.map_err(|e| bad_request(e.body_text()))?;
    let content = mobile::handle(&state.fetcher, &state.fetch_config, &args, method)
        .await
        .map_err(|e| bad_request(e.to_string()))?;
    Ok(Json(content))
}
