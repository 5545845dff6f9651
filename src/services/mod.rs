//! Service layer: database access and CDN upload client.

pub mod cdn;
pub mod database;

pub use cdn::{CdnClient, CdnUpload};
pub use database::Database;
