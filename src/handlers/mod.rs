//! HTTP request handlers for the media gallery server.
//!
//! This module contains all endpoint handlers organized by functionality:
//! - `media`: public read API (lists, random, by-id, search, by-category)
//! - `admin`: administrative endpoints (login, schema init, stats, bulk upload)
//! - `health`: status banner and health check

pub mod admin;
pub mod health;
pub mod media;

pub use admin::admin_routes;
pub use health::health_routes;
pub use media::media_routes;
