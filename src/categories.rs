//! Fixed category allow-list and normalization.
//!
//! Every category reaching a SQL statement goes through [`validate`] first;
//! the raw client value never does.

use crate::error::{AppError, Result};

/// Canonical category identifiers accepted by the gallery.
pub const ALLOWED_CATEGORIES: [&str; 12] = [
    "nature",
    "animals",
    "architecture",
    "food",
    "travel",
    "sports",
    "technology",
    "art",
    "music",
    "fashion",
    "space",
    "abstract",
];

/// Normalize a raw category value: trim, lowercase, and collapse runs of
/// whitespace into a single underscore.
pub fn normalize(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Normalize and check membership in the allow-list.
///
/// Returns the canonical value, or an `InvalidCategory` error (mapped to a
/// 400 response) when the normalized form is not allowed.
pub fn validate(raw: &str) -> Result<String> {
    let normalized = normalize(raw);
    if ALLOWED_CATEGORIES.contains(&normalized.as_str()) {
        Ok(normalized)
    } else {
        Err(AppError::InvalidCategory(format!(
            "'{}' is not an allowed category (allowed: {})",
            raw,
            ALLOWED_CATEGORIES.join(", ")
        )))
    }
}
