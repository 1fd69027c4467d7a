//! Health check handler
//!
//! Provides the health endpoint for monitoring and orchestration.

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status: "healthy" or "degraded"
    pub status: &'static str,
    /// Server version from Cargo.toml
    pub version: &'static str,
    /// Whether the vision evaluator is configured
    pub evaluator_configured: bool,
    /// Service name
    pub service: &'static str,
}

/// GET /health - Health check endpoint
///
/// Reports "degraded" when no working evaluator is wired into the
/// pipeline: uploads still work but every dossier escalates to human
/// review.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service health", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let evaluator_configured = state.evaluator_configured;

    Json(HealthResponse {
        status: if evaluator_configured {
            "healthy"
        } else {
            "degraded"
        },
        version: env!("CARGO_PKG_VERSION"),
        evaluator_configured,
        service: "veriface-server",
    })
}
