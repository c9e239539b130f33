//! HTTP API for the control service.
//!
//! Provides endpoints for:
//! - Template and credential upload
//! - Triggering a deployment
//! - Status queries
//! - Health checks

mod deployments;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::orchestrator::Orchestrator;

pub use deployments::{ErrorResponse, UploadResponse};

/// Shared application state for the control service.
#[derive(Clone)]
pub struct AppState {
    /// Orchestrator driving deployments.
    pub orchestrator: Arc<Orchestrator>,
    /// Largest accepted upload body in bytes.
    pub max_upload_bytes: usize,
}

/// Creates the API router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let body_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    Router::new()
        .route("/health", get(health_check))
        .route("/upload", post(deployments::upload))
        .route("/deploy/{id}", post(deployments::deploy))
        .route("/status/{id}", get(deployments::status))
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

/// Health response.
#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
}
