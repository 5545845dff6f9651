//! Status banner and health check endpoints.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::error::Result;
use crate::services::database::TypeCounts;
use crate::state::AppState;

/// Status banner response
#[derive(Debug, Serialize)]
pub struct BannerResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub status: &'static str,
}

/// Status banner
///
/// GET /
async fn banner() -> Json<BannerResponse> {
    Json(BannerResponse {
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        status: "ok",
    })
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: TypeCounts,
}

/// Health check -- verifies database connectivity by counting records.
///
/// GET /health
///
/// A database failure propagates as a 500.
async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    let counts = state.db.type_counts().await?;

    Ok(Json(HealthResponse {
        status: "ok",
        database: counts,
    }))
}

/// Create banner and health routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(banner))
        .route("/health", get(health))
}
