//! Data models for the media gallery server.

pub mod media;

pub use media::{EmptyResult, MediaPage, MediaRecord, MediaType, NewMedia};
