//! Administrative API handlers.
//!
//! Everything except `/login` sits behind the [`AdminAuth`] bearer-token
//! gate.
//!
//! ## Endpoints (nested at `/api/admin`)
//!
//! - `POST /login` - exchange admin credentials for a bearer token
//! - `GET /init-db` - re-run idempotent schema creation
//! - `GET /stats` - aggregate counts and per-category breakdown
//! - `GET /tables` - record counts by type
//! - `POST /bulk-upload` - multipart batch upload to the CDN
//!
//! ## Bulk upload
//!
//! Accepts up to `MAX_UPLOAD_FILES` files. The `titles` and `categories`
//! fields each accept a single value, a JSON-encoded array, or repeated
//! form fields; a single value is replicated across the batch (titles get
//! a 1-based index suffix to stay distinct, categories repeat verbatim).
//! Files are processed strictly sequentially and each failure is isolated:
//! the batch response is always 200 and reports per-file outcomes.

use axum::{
    extract::{Multipart, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::categories::{self, ALLOWED_CATEGORIES};
use crate::error::{AppError, Result};
use crate::middleware::auth::{issue_token, verify_password, AdminAuth};
use crate::models::{MediaRecord, MediaType, NewMedia};
use crate::services::database::{GalleryStats, TypeCounts};
use crate::state::AppState;

// =============================================================================
// Login
// =============================================================================

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in_minutes: i64,
}

/// Exchange admin credentials for a bearer token
///
/// POST /api/admin/login
///
/// Returns 400 when either field is missing, 401 on a credential mismatch.
async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let (username, password) = match (request.username, request.password) {
        (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => (u, p),
        _ => {
            return Err(AppError::validation(
                "Both 'username' and 'password' are required",
            ))
        }
    };

    let auth = &state.config.auth;

    // Verify the password unconditionally so a bad username costs the same
    // time as a bad password.
    let password_ok = verify_password(&password, &auth.admin_password_hash)
        .map_err(|e| AppError::internal(format!("Password verification failed: {e}")))?;
    let username_ok = username == auth.admin_username;

    if !(username_ok && password_ok) {
        warn!(username = %username, "Failed admin login attempt");
        return Err(AppError::unauthorized("Invalid credentials"));
    }

    let token = issue_token(&username, auth)
        .map_err(|e| AppError::internal(format!("Token issuance failed: {e}")))?;

    info!(username = %username, "Admin login");

    Ok(Json(LoginResponse {
        token,
        expires_in_minutes: auth.token_expiry_mins,
    }))
}

// =============================================================================
// Introspection
// =============================================================================

/// Schema init response
#[derive(Debug, Serialize)]
pub struct InitDbResponse {
    pub success: bool,
    pub message: String,
}

/// Re-run idempotent schema creation
///
/// GET /api/admin/init-db
async fn init_db(State(state): State<AppState>) -> Result<Json<InitDbResponse>> {
    state.db.ensure_schema().await?;

    Ok(Json(InitDbResponse {
        success: true,
        message: "Media schema ensured".to_string(),
    }))
}

/// Stats response: aggregates plus the category allow-list
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: GalleryStats,
    pub allowed_categories: Vec<&'static str>,
}

/// Aggregate statistics
///
/// GET /api/admin/stats
async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let stats = state.db.stats().await?;

    Ok(Json(StatsResponse {
        stats,
        allowed_categories: ALLOWED_CATEGORIES.to_vec(),
    }))
}

/// Tables response
#[derive(Debug, Serialize)]
pub struct TablesResponse {
    pub media: TypeCounts,
}

/// Record counts by type
///
/// GET /api/admin/tables
async fn tables(State(state): State<AppState>) -> Result<Json<TablesResponse>> {
    let counts = state.db.type_counts().await?;
    Ok(Json(TablesResponse { media: counts }))
}

// =============================================================================
// Bulk upload
// =============================================================================

/// One successfully uploaded file
#[derive(Debug, Serialize)]
pub struct UploadedItem {
    pub filename: String,
    pub title: String,
    pub category: String,
    pub media: MediaRecord,
}

/// One failed file, with its position in the batch
#[derive(Debug, Serialize)]
pub struct UploadFailure {
    pub filename: String,
    pub index: usize,
    pub error: String,
}

/// Batch outcome report; the HTTP status is 200 even with failures
#[derive(Debug, Serialize)]
pub struct BulkUploadReport {
    pub success: usize,
    pub failed: usize,
    pub uploaded_media: Vec<UploadedItem>,
    pub errors: Vec<UploadFailure>,
}

/// One file pulled out of the multipart stream
struct RawFile {
    filename: String,
    content_type: String,
    data: bytes::Bytes,
}

/// Bulk upload: multipart intake, CDN upload, metadata insert
///
/// POST /api/admin/bulk-upload
async fn bulk_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<BulkUploadReport>> {
    // A missing CDN account fails the whole batch before any file work.
    if !state.cdn.is_configured() {
        return Err(AppError::config("CDN credentials are not configured"));
    }

    let batch = read_batch(&state, multipart).await?;

    if batch.files.is_empty() {
        return Err(AppError::validation("No files uploaded"));
    }

    let media_type_raw = batch
        .media_type
        .as_deref()
        .map(str::trim)
        .unwrap_or_default();
    let media_type = MediaType::from_str(media_type_raw).ok_or_else(|| {
        AppError::validation("Field 'media_type' must be one of: image, gif")
    })?;

    let count = batch.files.len();
    let titles = expand_field(batch.titles, count, "titles", Replication::IndexedTitles)?;
    let cats = expand_field(batch.categories, count, "categories", Replication::Verbatim)?;

    let mut uploaded_media = Vec::new();
    let mut errors = Vec::new();

    // Strictly sequential, each file independently fault-isolated.
    for (index, ((file, title), category)) in batch
        .files
        .into_iter()
        .zip(titles)
        .zip(cats)
        .enumerate()
    {
        let filename = file.filename.clone();
        match process_file(&state, file, &title, &category, media_type).await {
            Ok(item) => uploaded_media.push(item),
            Err(e) => {
                warn!(filename = %filename, index, error = %e, "Bulk upload file failed");
                errors.push(UploadFailure {
                    filename,
                    index,
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        success = uploaded_media.len(),
        failed = errors.len(),
        media_type = %media_type,
        "Bulk upload complete"
    );

    Ok(Json(BulkUploadReport {
        success: uploaded_media.len(),
        failed: errors.len(),
        uploaded_media,
        errors,
    }))
}

/// Fields pulled out of the multipart request
#[derive(Default)]
struct RawBatch {
    files: Vec<RawFile>,
    titles: Vec<String>,
    categories: Vec<String>,
    media_type: Option<String>,
}

/// Drain the multipart stream into a [`RawBatch`], enforcing the batch
/// size, per-file size, and MIME restrictions at intake.
async fn read_batch(state: &AppState, mut multipart: Multipart) -> Result<RawBatch> {
    let mut batch = RawBatch::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Invalid multipart data: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "files" => {
                if batch.files.len() >= state.max_upload_files() {
                    return Err(AppError::validation(format!(
                        "At most {} files per upload",
                        state.max_upload_files()
                    )));
                }

                let filename = field
                    .file_name()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "upload".to_string());
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());

                if !state.is_allowed_mime_type(&content_type) {
                    return Err(AppError::validation(format!(
                        "File '{filename}' has unsupported type '{content_type}'"
                    )));
                }

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation(format!("Failed to read file: {e}")))?;

                if data.len() as u64 > state.max_file_size() {
                    return Err(AppError::validation(format!(
                        "File '{filename}' exceeds the {} byte limit",
                        state.max_file_size()
                    )));
                }

                batch.files.push(RawFile {
                    filename,
                    content_type,
                    data,
                });
            }
            "titles" => batch.titles.push(read_text_field(field).await?),
            "categories" => batch.categories.push(read_text_field(field).await?),
            "media_type" => batch.media_type = Some(read_text_field(field).await?),
            other => debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    Ok(batch)
}

async fn read_text_field(field: axum::extract::multipart::Field<'_>) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::validation(format!("Failed to read form field: {e}")))
}

/// How a single supplied value is replicated across the batch
#[derive(Debug, Clone, Copy, PartialEq)]
enum Replication {
    /// `"Sunset"` for 3 files becomes `"Sunset 1"`, `"Sunset 2"`, `"Sunset 3"`
    IndexedTitles,
    /// The value repeats unchanged
    Verbatim,
}

/// Normalize an array-or-scalar form field into exactly `count` values.
///
/// The raw occurrences may be repeated form fields or a single occurrence
/// holding a JSON-encoded array. Replication applies only when exactly one
/// value was supplied for a multi-file batch; any other length mismatch is
/// a 400 with a count diagnostic.
fn expand_field(
    raw: Vec<String>,
    count: usize,
    field: &'static str,
    replication: Replication,
) -> Result<Vec<String>> {
    let mut values = raw;

    // A lone occurrence may be a JSON-encoded array.
    if values.len() == 1 {
        if let Some(decoded) = decode_json_array(&values[0]) {
            values = decoded;
        }
    }

    match values.len() {
        0 => Err(AppError::validation(format!("Field '{field}' is required"))),
        1 if count > 1 => {
            let value = values.pop().unwrap_or_default();
            Ok(match replication {
                Replication::IndexedTitles => (1..=count)
                    .map(|i| format!("{value} {i}"))
                    .collect(),
                Replication::Verbatim => vec![value; count],
            })
        }
        n if n == count => Ok(values),
        n => Err(AppError::validation(format!(
            "Number of {field} ({n}) must match number of files ({count})"
        ))),
    }
}

/// Decode a JSON array of strings, or return None when the value is not one
fn decode_json_array(raw: &str) -> Option<Vec<String>> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                serde_json::Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => None,
    }
}

/// Process one file of the batch: validate, upload to the CDN, insert the
/// metadata row. Every failure is reported to the caller per-file.
async fn process_file(
    state: &AppState,
    file: RawFile,
    raw_title: &str,
    raw_category: &str,
    media_type: MediaType,
) -> Result<UploadedItem> {
    let title = raw_title.trim();
    if title.is_empty() {
        return Err(AppError::validation("Title must not be empty"));
    }

    let category = categories::validate(raw_category)?;

    let upload = state
        .cdn
        .upload(
            file.data,
            &file.filename,
            &file.content_type,
            &category,
            media_type == MediaType::Gif,
        )
        .await?;

    let record = state
        .db
        .insert_media(&NewMedia {
            title: title.to_string(),
            category: category.clone(),
            url: upload.url,
            media_type,
        })
        .await?;

    Ok(UploadedItem {
        filename: file.filename,
        title: title.to_string(),
        category,
        media: record,
    })
}

/// Create admin routes; everything except `/login` is token-gated
pub fn admin_routes(state: &AppState) -> Router<AppState> {
    let auth = AdminAuth::new(&state.config.auth);

    let gated = Router::new()
        .route("/init-db", get(init_db))
        .route("/stats", get(stats))
        .route("/tables", get(tables))
        .route("/bulk-upload", post(bulk_upload))
        .layer(auth.layer());

    Router::new().route("/login", post(login)).merge(gated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_single_title_replicates_with_index() {
        let titles =
            expand_field(strings(&["Sunset"]), 3, "titles", Replication::IndexedTitles).unwrap();
        assert_eq!(titles, vec!["Sunset 1", "Sunset 2", "Sunset 3"]);
    }

    #[test]
    fn test_single_title_for_single_file_is_unchanged() {
        let titles =
            expand_field(strings(&["Sunset"]), 1, "titles", Replication::IndexedTitles).unwrap();
        assert_eq!(titles, vec!["Sunset"]);
    }

    #[test]
    fn test_single_category_repeats_verbatim() {
        let cats =
            expand_field(strings(&["nature"]), 3, "categories", Replication::Verbatim).unwrap();
        assert_eq!(cats, vec!["nature", "nature", "nature"]);
    }

    #[test]
    fn test_exact_length_passes_through() {
        let titles = expand_field(
            strings(&["a", "b", "c"]),
            3,
            "titles",
            Replication::IndexedTitles,
        )
        .unwrap();
        assert_eq!(titles, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_count_mismatch_is_rejected() {
        let err = expand_field(
            strings(&["a", "b"]),
            3,
            "titles",
            Replication::IndexedTitles,
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("titles"));
        assert!(msg.contains('2'));
        assert!(msg.contains('3'));
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let err = expand_field(vec![], 2, "categories", Replication::Verbatim).unwrap_err();
        assert!(err.to_string().contains("categories"));
    }

    #[test]
    fn test_json_array_is_decoded() {
        let titles = expand_field(
            strings(&[r#"["a", "b", "c"]"#]),
            3,
            "titles",
            Replication::IndexedTitles,
        )
        .unwrap();
        assert_eq!(titles, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_json_array_length_mismatch_is_rejected() {
        let result = expand_field(
            strings(&[r#"["a", "b"]"#]),
            3,
            "titles",
            Replication::IndexedTitles,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_single_element_json_array_replicates() {
        let cats = expand_field(
            strings(&[r#"["nature"]"#]),
            2,
            "categories",
            Replication::Verbatim,
        )
        .unwrap();
        assert_eq!(cats, vec!["nature", "nature"]);
    }

    #[test]
    fn test_non_array_json_is_treated_as_plain_value() {
        // A title that merely looks JSON-ish stays a plain string.
        let titles = expand_field(
            strings(&["{\"x\": 1}"]),
            1,
            "titles",
            Replication::IndexedTitles,
        )
        .unwrap();
        assert_eq!(titles, vec!["{\"x\": 1}"]);
    }

    #[test]
    fn test_decode_json_array_rejects_mixed_types() {
        assert_eq!(decode_json_array(r#"["a", 1]"#), None);
        assert_eq!(decode_json_array("plain title"), None);
        assert_eq!(
            decode_json_array(r#"["a"]"#),
            Some(vec!["a".to_string()])
        );
    }
}
