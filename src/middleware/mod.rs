//! Middleware components for the media gallery server.

pub mod auth;

pub use auth::AdminAuth;
