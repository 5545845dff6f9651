//! Application state management.
//!
//! This module defines the shared application state that is accessible
//! from all request handlers via Axum's State extractor.
//!
//! # Usage
//!
//! ```rust,ignore
//! async fn handler(State(state): State<AppState>) -> impl IntoResponse {
//!     let page = state.db.list_by_type(MediaType::Image, 50, 0).await?;
//!     // ...
//! }
//! ```

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::services::{CdnClient, Database};

/// Shared application state
///
/// Holds all shared resources handlers need access to. Cheap to clone;
/// the pool and HTTP client are internally reference-counted.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,

    /// Database service for metadata operations
    pub db: Database,

    /// CDN upload client
    pub cdn: Arc<CdnClient>,
}

impl AppState {
    /// Create a new application state: connect the pool, ensure the
    /// schema, and construct the CDN client.
    ///
    /// # Errors
    /// Returns error if the database is unreachable or services cannot be
    /// initialized.
    pub async fn new(config: Config) -> Result<Self> {
        let db = Database::connect(&config.database).await?;
        db.ensure_schema().await?;

        let cdn = CdnClient::new(&config.cdn)?;
        if !cdn.is_configured() {
            tracing::warn!("CDN credentials not configured; bulk uploads will be rejected");
        }

        Ok(Self {
            config: Arc::new(config),
            db,
            cdn: Arc::new(cdn),
        })
    }

    /// Maximum number of files accepted per bulk upload
    pub fn max_upload_files(&self) -> usize {
        self.config.upload.max_files
    }

    /// Maximum size per uploaded file
    pub fn max_file_size(&self) -> u64 {
        self.config.upload.max_file_size
    }

    /// Check if a MIME type is allowed for upload
    pub fn is_allowed_mime_type(&self, mime_type: &str) -> bool {
        self.config.upload.is_allowed_type(mime_type)
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &"<Config>")
            .field("db", &self.db)
            .field("cdn", &"<CdnClient>")
            .finish()
    }
}
