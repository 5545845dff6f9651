//! Public read API over the media table.
//!
//! All handlers here are read-only and anonymous. An empty result set is an
//! expected outcome: it yields a 404 with a structured payload
//! (`{"message", "total": 0, "media": []}`) rather than an error.
//!
//! ## Endpoints (nested at `/api/media`)
//!
//! - `GET /all-images`, `GET /all-gifs` - paginated listing, newest first
//! - `GET /random[/image|/gif][/{category}]` - one uniformly random record
//! - `GET /image/id/{id}`, `GET /gif/id/{id}` - direct lookup (bumps views)
//! - `GET /search/image`, `GET /search/gif` - title/category substring search
//! - `GET /image/{category}`, `GET /gif/{category}` - category listing

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::categories;
use crate::error::{AppError, Result};
use crate::models::{EmptyResult, MediaPage, MediaType};
use crate::state::AppState;

/// Page size applied when `limit` is absent
const DEFAULT_LIMIT: i64 = 50;

/// Hard page-size ceiling for list and category endpoints
const MAX_LIMIT: i64 = 200;

/// Tighter page-size ceiling for search endpoints
const SEARCH_MAX_LIMIT: i64 = 100;

/// Maximum accepted search-term length in characters
const MAX_SEARCH_LEN: usize = 255;

/// Pagination query parameters
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageParams {
    /// Clamp to a usable window: limit in `[1, max_limit]` (default 50),
    /// offset non-negative (default 0).
    fn clamped(&self, max_limit: i64) -> (i64, i64) {
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, max_limit);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

/// Search query parameters
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Search result page, echoing the query term
#[derive(Debug, Serialize)]
struct SearchPage {
    query: String,
    #[serde(flatten)]
    page: MediaPage,
}

// =============================================================================
// Listing
// =============================================================================

/// List visible images, newest first
///
/// GET /api/media/all-images
async fn all_images(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Response> {
    list_by_type(state, MediaType::Image, params).await
}

/// List visible GIFs, newest first
///
/// GET /api/media/all-gifs
async fn all_gifs(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Response> {
    list_by_type(state, MediaType::Gif, params).await
}

async fn list_by_type(
    state: AppState,
    media_type: MediaType,
    params: PageParams,
) -> Result<Response> {
    let (limit, offset) = params.clamped(MAX_LIMIT);

    let total = state.db.count_by_type(media_type).await?;
    let rows = state.db.list_by_type(media_type, limit, offset).await?;

    if rows.is_empty() {
        return Ok(empty_response(format!(
            "No {} found",
            media_type.plural()
        )));
    }

    Ok(Json(MediaPage::new(total, limit, offset, rows)).into_response())
}

// =============================================================================
// Random
// =============================================================================

/// One random visible record of any type
///
/// GET /api/media/random
async fn random_any(State(state): State<AppState>) -> Result<Response> {
    random(state, None, None).await
}

/// GET /api/media/random/{category}
///
/// The static `/random/image` and `/random/gif` routes take precedence
/// over this capture.
async fn random_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Response> {
    let category = categories::validate(&category)?;
    random(state, None, Some(category)).await
}

/// GET /api/media/random/image
async fn random_image(State(state): State<AppState>) -> Result<Response> {
    random(state, Some(MediaType::Image), None).await
}

/// GET /api/media/random/gif
async fn random_gif(State(state): State<AppState>) -> Result<Response> {
    random(state, Some(MediaType::Gif), None).await
}

/// GET /api/media/random/image/{category}
async fn random_image_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Response> {
    let category = categories::validate(&category)?;
    random(state, Some(MediaType::Image), Some(category)).await
}

/// GET /api/media/random/gif/{category}
async fn random_gif_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Response> {
    let category = categories::validate(&category)?;
    random(state, Some(MediaType::Gif), Some(category)).await
}

async fn random(
    state: AppState,
    media_type: Option<MediaType>,
    category: Option<String>,
) -> Result<Response> {
    match state.db.random(media_type, category.as_deref()).await? {
        Some(record) => Ok(Json(record).into_response()),
        None => Ok(empty_response("No matching media found")),
    }
}

// =============================================================================
// Lookup by id
// =============================================================================

/// GET /api/media/image/id/{id}
async fn image_by_id(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Response> {
    lookup_by_id(state, MediaType::Image, &raw_id).await
}

/// GET /api/media/gif/id/{id}
async fn gif_by_id(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Response> {
    lookup_by_id(state, MediaType::Gif, &raw_id).await
}

/// Fetch one visible record by id and detach a view-count increment.
///
/// The increment is fire-and-forget: its outcome is never awaited by the
/// response path, and failures are logged only.
async fn lookup_by_id(state: AppState, media_type: MediaType, raw_id: &str) -> Result<Response> {
    let id = parse_id(raw_id)?;

    let record = match state.db.find_visible_by_id(id, media_type).await? {
        Some(record) => record,
        None => {
            return Ok(empty_response(format!(
                "No {} with id {}",
                media_type.as_str(),
                id
            )))
        }
    };

    let db = state.db.clone();
    tokio::spawn(async move {
        match db.increment_views(id).await {
            Ok(0) => warn!(id, "View increment matched no row"),
            Ok(_) => {}
            Err(e) => warn!(id, error = %e, "View increment failed"),
        }
    });

    Ok(Json(record).into_response())
}

/// Parse a path segment as a positive integer id
fn parse_id(raw: &str) -> Result<i64> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::validation(format!("'{raw}' is not a valid positive id")))
}

// =============================================================================
// Search
// =============================================================================

/// GET /api/media/search/image?q=...
async fn search_images(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Response> {
    search(state, MediaType::Image, params).await
}

/// GET /api/media/search/gif?q=...
async fn search_gifs(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Response> {
    search(state, MediaType::Gif, params).await
}

/// Case-insensitive substring search against title or category,
/// most-viewed first.
async fn search(state: AppState, media_type: MediaType, params: SearchParams) -> Result<Response> {
    let term = params.q.as_deref().unwrap_or("").trim().to_string();
    if term.is_empty() {
        return Err(AppError::validation("Query parameter 'q' is required"));
    }
    if term.chars().count() > MAX_SEARCH_LEN {
        return Err(AppError::validation(format!(
            "Query must be at most {MAX_SEARCH_LEN} characters"
        )));
    }

    let page_params = PageParams {
        limit: params.limit,
        offset: params.offset,
    };
    let (limit, offset) = page_params.clamped(SEARCH_MAX_LIMIT);

    let total = state.db.search_count(media_type, &term).await?;
    let rows = state.db.search(media_type, &term, limit, offset).await?;

    if rows.is_empty() {
        return Ok(empty_response(format!(
            "No {} matching '{}'",
            media_type.plural(),
            term
        )));
    }

    Ok(Json(SearchPage {
        query: term,
        page: MediaPage::new(total, limit, offset, rows),
    })
    .into_response())
}

// =============================================================================
// By category
// =============================================================================

/// GET /api/media/image/{category}
async fn images_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Response> {
    category_page(state, MediaType::Image, &category, params).await
}

/// GET /api/media/gif/{category}
async fn gifs_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Response> {
    category_page(state, MediaType::Gif, &category, params).await
}

async fn category_page(
    state: AppState,
    media_type: MediaType,
    raw_category: &str,
    params: PageParams,
) -> Result<Response> {
    let category = categories::validate(raw_category)?;
    let (limit, offset) = params.clamped(MAX_LIMIT);

    let total = state.db.count_by_category(media_type, &category).await?;
    let rows = state
        .db
        .list_by_category(media_type, &category, limit, offset)
        .await?;

    if rows.is_empty() {
        return Ok(empty_response(format!(
            "No {} in category '{}'",
            media_type.plural(),
            category
        )));
    }

    Ok(Json(MediaPage::new(total, limit, offset, rows)).into_response())
}

// =============================================================================
// Helpers
// =============================================================================

/// Build the structured 404 payload for zero matching rows
fn empty_response(message: impl Into<String>) -> Response {
    (StatusCode::NOT_FOUND, Json(EmptyResult::new(message))).into_response()
}

/// Create public media routes
pub fn media_routes() -> Router<AppState> {
    Router::new()
        .route("/all-images", get(all_images))
        .route("/all-gifs", get(all_gifs))
        .route("/random", get(random_any))
        .route("/random/{category}", get(random_by_category))
        .route("/random/image", get(random_image))
        .route("/random/gif", get(random_gif))
        .route("/random/image/{category}", get(random_image_by_category))
        .route("/random/gif/{category}", get(random_gif_by_category))
        .route("/image/id/{id}", get(image_by_id))
        .route("/gif/id/{id}", get(gif_by_id))
        .route("/search/image", get(search_images))
        .route("/search/gif", get(search_gifs))
        .route("/image/{category}", get(images_by_category))
        .route("/gif/{category}", get(gifs_by_category))
}
