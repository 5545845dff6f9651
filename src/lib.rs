//! # Media Gallery Server
//!
//! A media-gallery backend written in Rust.
//!
//! ## Features
//!
//! - **Bulk Upload**: Multipart batches forwarded to an external CDN
//! - **Metadata Store**: PostgreSQL table of media records
//! - **Public Read API**: Paginated, filterable, and random queries
//! - **Admin API**: Token-gated login, stats, and schema management
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  HTTP Server                     │
//! │  ┌─────────────┐ ┌─────────────┐ ┌───────────┐ │
//! │  │ Media API   │ │ Admin API   │ │ Health    │ │
//! │  └─────────────┘ └─────────────┘ └───────────┘ │
//! ├─────────────────────────────────────────────────┤
//! │                   Services                       │
//! │        ┌─────────────┐ ┌─────────────┐          │
//! │        │  Database   │ │ CDN Client  │          │
//! │        └─────────────┘ └─────────────┘          │
//! ├─────────────────────────────────────────────────┤
//! │           PostgreSQL        Media CDN            │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the server
//! cargo run --release
//!
//! # Log in
//! curl -X POST http://localhost:3000/api/admin/login \
//!   -H "Content-Type: application/json" \
//!   -d '{"username": "admin", "password": "..."}'
//!
//! # Fetch a random image
//! curl http://localhost:3000/api/media/random/image
//! ```

pub mod categories;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;

pub use config::Config;
pub use error::{AppError, Result};
pub use middleware::AdminAuth;
pub use state::AppState;

use axum::extract::DefaultBodyLimit;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::info;

/// Run the media gallery server with the given configuration.
///
/// Connects the database pool, ensures the schema, and serves until a
/// shutdown signal (SIGINT/SIGTERM) arrives.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let state = AppState::new(config.clone()).await?;

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    info!(address = %addr, "Server starting");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    // CORS: the read API is public
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Body ceiling sized for the largest allowed batch
    let max_body = state.config.upload.max_files as u64 * state.config.upload.max_file_size
        + 1024 * 1024;

    Router::new()
        .merge(handlers::health_routes())
        .nest("/api/media", handlers::media_routes())
        .nest("/api/admin", handlers::admin_routes(&state))
        .fallback(not_found)
        .layer(cors)
        .layer(DefaultBodyLimit::max(max_body as usize))
        .layer(RequestBodyLimitLayer::new(max_body as usize))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// JSON 404 for unmatched routes
async fn not_found(uri: Uri) -> Response {
    let body = serde_json::json!({
        "error": "not_found",
        "message": format!("No route for {uri}"),
        "status": 404
    });
    (StatusCode::NOT_FOUND, Json(body)).into_response()
}

/// Any panic in a handler still yields a JSON 500
fn handle_panic(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %detail, "Handler panicked");

    let body = serde_json::json!({
        "error": "internal_error",
        "message": "An internal error occurred. Please try again later.",
        "status": 500
    });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

/// Resolve on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutdown signal received");
}
