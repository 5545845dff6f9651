//! Upload client for the external media CDN.
//!
//! File bytes are never stored locally: each upload is forwarded to the
//! CDN's HTTP upload API as a signed multipart request, and only the URL
//! the CDN returns is persisted. Requests are signed by hashing the sorted
//! parameter string together with the account secret (SHA-256).
//!
//! The account is configured via `CDN_CLOUD_NAME` / `CDN_API_KEY` /
//! `CDN_API_SECRET`; the API base is overridable (`CDN_API_BASE`) so tests
//! can point the client at a local mock.

use bytes::Bytes;
use reqwest::multipart;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::CdnConfig;
use crate::error::{AppError, Result};

/// Result of a successful CDN upload
#[derive(Debug, Clone)]
pub struct CdnUpload {
    /// Absolute URL under which the CDN serves the file
    pub url: String,
    /// CDN-side object identifier
    pub public_id: String,
}

/// Fields of interest in the CDN's upload response
#[derive(Debug, serde::Deserialize)]
struct UploadApiResponse {
    secure_url: Option<String>,
    public_id: Option<String>,
}

/// Client for the CDN upload API
#[derive(Debug, Clone)]
pub struct CdnClient {
    http: reqwest::Client,
    config: CdnConfig,
}

impl CdnClient {
    /// Build a client from the CDN configuration
    pub fn new(config: &CdnConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.upload_timeout_secs))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            config: config.clone(),
        })
    }

    /// Whether all account credentials are present
    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Upload one file and return its CDN URL.
    ///
    /// The object lands under `folder` with a fresh UUID name. GIF uploads
    /// force the animated-GIF output format so the CDN does not flatten
    /// frames.
    pub async fn upload(
        &self,
        data: Bytes,
        filename: &str,
        mime_type: &str,
        folder: &str,
        force_gif: bool,
    ) -> Result<CdnUpload> {
        let (cloud_name, api_key, api_secret) = self.credentials()?;

        let timestamp = chrono::Utc::now().timestamp().to_string();
        let public_id = Uuid::new_v4().simple().to_string();

        let mut params = vec![
            ("folder".to_string(), folder.to_string()),
            ("public_id".to_string(), public_id.clone()),
            ("timestamp".to_string(), timestamp.clone()),
        ];
        if force_gif {
            params.push(("format".to_string(), "gif".to_string()));
        }

        let signature = sign_params(&params, api_secret);

        let mut form = multipart::Form::new()
            .text("api_key", api_key.to_string())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        for (name, value) in params {
            form = form.text(name, value);
        }

        let file_part = multipart::Part::bytes(data.to_vec())
            .file_name(filename.to_string())
            .mime_str(mime_type)
            .map_err(|e| AppError::cdn(format!("Invalid MIME type '{mime_type}': {e}")))?;
        form = form.part("file", file_part);

        let url = format!("{}/{}/image/upload", self.config.api_base, cloud_name);
        debug!(filename = %filename, folder = %folder, "Uploading file to CDN");

        let resp = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::cdn(format!("CDN request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AppError::cdn(format!("CDN upload failed ({status}): {body}")));
        }

        let body: UploadApiResponse = resp
            .json()
            .await
            .map_err(|e| AppError::cdn(format!("Invalid CDN response: {e}")))?;

        let url = body
            .secure_url
            .ok_or_else(|| AppError::cdn("CDN response missing secure_url"))?;

        info!(url = %url, folder = %folder, "CDN upload complete");

        Ok(CdnUpload {
            url,
            public_id: body.public_id.unwrap_or(public_id),
        })
    }

    fn credentials(&self) -> Result<(&str, &str, &str)> {
        match (
            self.config.cloud_name.as_deref(),
            self.config.api_key.as_deref(),
            self.config.api_secret.as_deref(),
        ) {
            (Some(cloud), Some(key), Some(secret)) => Ok((cloud, key, secret)),
            _ => Err(AppError::config("CDN credentials are not configured")),
        }
    }
}

/// Sign request parameters: sort by name, join `name=value` pairs with `&`,
/// append the secret, and hex-encode the SHA-256 digest.
fn sign_params(params: &[(String, String)], secret: &str) -> String {
    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let joined = sorted
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}
