//! Error types for the media gallery server.
//!
//! This module defines a unified error handling system using `thiserror`.
//! All errors are converted to appropriate HTTP responses automatically.
//!
//! # Error Categories
//!
//! - **Client errors (4xx)**: Invalid input, auth failures, not found
//! - **Server errors (5xx)**: Database failures, CDN failures, internal errors
//!
//! Server-error details are included in the response body only for debug
//! builds; release builds return a generic message and log the original.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
///
/// Each variant is mapped to an appropriate HTTP status code.
#[derive(Debug, Error)]
pub enum AppError {
    // -------------------------------------------------------------------------
    // Client Errors (4xx)
    // -------------------------------------------------------------------------
    /// Invalid request or validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Category outside the fixed allow-list
    #[error("Invalid category: {0}")]
    InvalidCategory(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing, malformed, expired, or badly signed credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Valid credentials lacking the admin privilege
    #[error("Forbidden: {0}")]
    Forbidden(String),

    // -------------------------------------------------------------------------
    // Server Errors (5xx)
    // -------------------------------------------------------------------------
    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// CDN upload or response error
    #[error("CDN error: {0}")]
    Cdn(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    // -------------------------------------------------------------------------
    // Convenience constructors
    // -------------------------------------------------------------------------

    /// Create a validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an unauthorized error
    pub fn unauthorized<S: Into<String>>(msg: S) -> Self {
        Self::Unauthorized(msg.into())
    }

    /// Create a forbidden error
    pub fn forbidden<S: Into<String>>(msg: S) -> Self {
        Self::Forbidden(msg.into())
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a CDN error
    pub fn cdn<S: Into<String>>(msg: S) -> Self {
        Self::Cdn(msg.into())
    }

    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 4xx Client Errors
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::InvalidCategory(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,

            // 5xx Server Errors
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Cdn(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

/// Error response body sent to clients
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type/code
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// HTTP status code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Add status code to the response
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status.as_u16());
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Log server errors
        if self.is_server_error() {
            tracing::error!(error = %self, "Server error occurred");
        } else {
            tracing::debug!(error = %self, "Client error occurred");
        }

        let error_type = match &self {
            Self::Validation(_) => "validation_error",
            Self::InvalidCategory(_) => "invalid_category",
            Self::NotFound(_) => "not_found",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::Internal(_) => "internal_error",
            Self::Database(_) => "database_error",
            Self::Cdn(_) => "cdn_error",
            Self::Config(_) => "config_error",
        };

        // Server-error details stay out of release responses
        let message = if self.is_server_error() && !cfg!(debug_assertions) {
            "An internal error occurred. Please try again later.".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse::new(error_type, message).with_status(status);

        (status, Json(body)).into_response()
    }
}
