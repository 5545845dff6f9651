//! Media entity model and page DTOs.
//!
//! A [`MediaRecord`] is one row of the `media` table: the metadata for an
//! uploaded image or GIF whose bytes live on the CDN.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Media type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// Static image (JPEG, PNG, WebP)
    Image,
    /// Animated GIF
    Gif,
}

impl MediaType {
    /// Convert to database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Gif => "gif",
        }
    }

    /// Parse from database string representation
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "image" => Some(Self::Image),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Plural label used in route names and messages ("images", "gifs")
    pub fn plural(&self) -> &'static str {
        match self {
            Self::Image => "images",
            Self::Gif => "gifs",
        }
    }
}

impl TryFrom<String> for MediaType {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::from_str(&value).ok_or_else(|| format!("unknown media type '{value}'"))
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the `media` table
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MediaRecord {
    /// Auto-incrementing primary key
    pub id: i64,

    /// Display title (non-empty after trim)
    pub title: String,

    /// Canonical category from the fixed allow-list
    pub category: String,

    /// CDN-provided absolute URL of the file bytes
    pub url: String,

    /// "image" or "gif"
    #[sqlx(try_from = "String")]
    pub media_type: MediaType,

    /// View counter, incremented on direct by-id fetches
    pub views: i64,

    /// Soft-hide flag; hidden rows are excluded from all public reads
    pub visible: bool,

    /// Set at insert, immutable
    pub created_at: DateTime<Utc>,

    /// Refreshed whenever the row is touched (currently only by the view
    /// counter)
    pub updated_at: DateTime<Utc>,
}

/// Fields for inserting a new media row
#[derive(Debug, Clone)]
pub struct NewMedia {
    pub title: String,
    pub category: String,
    pub url: String,
    pub media_type: MediaType,
}

/// A page of media rows plus the separately computed total
#[derive(Debug, Serialize)]
pub struct MediaPage {
    /// Total rows matching the filter (ignores pagination)
    pub total: i64,
    /// Rows in this page
    pub count: usize,
    pub limit: i64,
    pub offset: i64,
    pub media: Vec<MediaRecord>,
}

impl MediaPage {
    pub fn new(total: i64, limit: i64, offset: i64, media: Vec<MediaRecord>) -> Self {
        Self {
            total,
            count: media.len(),
            limit,
            offset,
            media,
        }
    }
}

/// Structured empty-result payload returned with a 404 status.
///
/// Zero matching rows is an expected outcome, not a server error.
#[derive(Debug, Serialize)]
pub struct EmptyResult {
    pub message: String,
    pub total: i64,
    pub media: Vec<MediaRecord>,
}

impl EmptyResult {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            total: 0,
            media: Vec::new(),
        }
    }
}
