//! Configuration module for the media gallery server.
//!
//! All configuration is sourced from environment variables (a `.env` file is
//! honored in development via `dotenvy`). Required variables fail loading
//! with a descriptive error; optional ones fall back to development defaults
//! that are logged as unsafe where they matter.
//!
//! # Example
//! ```rust,ignore
//! let config = Config::from_env()?;
//! println!("Server will listen on {}:{}", config.server.host, config.server.port);
//! ```

use thiserror::Error;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub cdn: CdnConfig,
    pub upload: UploadConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string (required)
    pub url: String,
    /// Maximum pooled connections
    pub max_connections: u32,
}

/// Authentication configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Admin account username
    pub admin_username: String,
    /// Argon2 PHC hash of the admin password
    pub admin_password_hash: String,
    /// HMAC secret used to sign bearer tokens (required, non-empty)
    pub jwt_secret: String,
    /// Token lifetime in minutes
    pub token_expiry_mins: i64,
}

/// CDN account configuration
///
/// All three credentials must be present for uploads to work; the bulk
/// upload endpoint returns 500 otherwise.
#[derive(Debug, Clone, Default)]
pub struct CdnConfig {
    pub cloud_name: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    /// Upload API base URL (overridable for tests)
    pub api_base: String,
    /// Per-upload timeout in seconds
    pub upload_timeout_secs: u64,
}

impl CdnConfig {
    /// Whether all credentials needed for uploads are present
    pub fn is_configured(&self) -> bool {
        self.cloud_name.is_some() && self.api_key.is_some() && self.api_secret.is_some()
    }
}

/// Upload limits
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Maximum number of files per bulk upload
    pub max_files: usize,
    /// Maximum size per file in bytes
    pub max_file_size: u64,
    /// Allowed MIME types
    pub allowed_mime_types: Vec<String>,
}

impl UploadConfig {
    /// Check if a MIME type is allowed
    pub fn is_allowed_type(&self, mime_type: &str) -> bool {
        self.allowed_mime_types.iter().any(|t| t == mime_type)
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

/// Default CDN upload API base
const DEFAULT_CDN_API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Default per-file size ceiling (50 MB)
const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

impl Config {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns `ConfigError` if a required variable is missing or a value
    /// cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let server = ServerConfig {
            host: env_or("HOST", "0.0.0.0"),
            port: env_parse("PORT", 3000)?,
        };

        let database = DatabaseConfig {
            url: env_required("DATABASE_URL")?,
            max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 5)?,
        };

        let jwt_secret = env_required("JWT_SECRET")?;
        if jwt_secret.trim().is_empty() {
            return Err(ConfigError::Invalid {
                name: "JWT_SECRET",
                reason: "must not be empty".to_string(),
            });
        }

        let admin_username = match std::env::var("ADMIN_USERNAME") {
            Ok(v) if !v.is_empty() => v,
            _ => {
                tracing::warn!("ADMIN_USERNAME not set, using default 'admin' (unsafe for production)");
                "admin".to_string()
            }
        };

        let admin_password_hash = admin_password_hash_from_env()?;

        let auth = AuthConfig {
            admin_username,
            admin_password_hash,
            jwt_secret,
            token_expiry_mins: env_parse("TOKEN_EXPIRY_MINS", 60)?,
        };

        let cdn = CdnConfig {
            cloud_name: std::env::var("CDN_CLOUD_NAME").ok().filter(|v| !v.is_empty()),
            api_key: std::env::var("CDN_API_KEY").ok().filter(|v| !v.is_empty()),
            api_secret: std::env::var("CDN_API_SECRET").ok().filter(|v| !v.is_empty()),
            api_base: env_or("CDN_API_BASE", DEFAULT_CDN_API_BASE),
            upload_timeout_secs: env_parse("CDN_UPLOAD_TIMEOUT_SECS", 60)?,
        };

        let upload = UploadConfig {
            max_files: env_parse("MAX_UPLOAD_FILES", 100)?,
            max_file_size: env_parse("MAX_FILE_SIZE_BYTES", DEFAULT_MAX_FILE_SIZE)?,
            allowed_mime_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/gif".to_string(),
                "image/webp".to_string(),
            ],
        };

        let logging = LoggingConfig {
            level: env_or("LOG_LEVEL", "info"),
            format: env_or("LOG_FORMAT", "pretty"),
        };

        let config = Config {
            server,
            database,
            auth,
            cdn,
            upload,
            logging,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError> {
        if self.upload.max_files == 0 {
            return Err(ConfigError::ValidationError(
                "MAX_UPLOAD_FILES must be at least 1".to_string(),
            ));
        }

        if self.upload.max_file_size == 0 {
            return Err(ConfigError::ValidationError(
                "MAX_FILE_SIZE_BYTES must be greater than 0".to_string(),
            ));
        }

        if self.auth.token_expiry_mins <= 0 {
            return Err(ConfigError::ValidationError(
                "TOKEN_EXPIRY_MINS must be positive".to_string(),
            ));
        }

        if self.cdn.api_base.ends_with('/') {
            return Err(ConfigError::ValidationError(
                "CDN_API_BASE should not have a trailing slash".to_string(),
            ));
        }

        Ok(())
    }
}

/// Resolve the admin password hash.
///
/// Prefers `ADMIN_PASSWORD_HASH` (an argon2 PHC string). Falls back to
/// hashing a plaintext `ADMIN_PASSWORD` at startup, which is acceptable for
/// development only and logged as such.
fn admin_password_hash_from_env() -> Result<String, ConfigError> {
    if let Ok(hash) = std::env::var("ADMIN_PASSWORD_HASH") {
        if !hash.is_empty() {
            if !hash.starts_with("$argon2") {
                return Err(ConfigError::Invalid {
                    name: "ADMIN_PASSWORD_HASH",
                    reason: "expected an argon2 PHC string".to_string(),
                });
            }
            return Ok(hash);
        }
    }

    let plaintext = match std::env::var("ADMIN_PASSWORD") {
        Ok(v) if !v.is_empty() => {
            tracing::warn!(
                "ADMIN_PASSWORD_HASH not set, hashing plaintext ADMIN_PASSWORD at startup (unsafe for production)"
            );
            v
        }
        _ => {
            tracing::warn!(
                "No admin password configured, using default 'changeme' (unsafe for production)"
            );
            "changeme".to_string()
        }
    };

    crate::middleware::auth::hash_password(&plaintext).map_err(|e| ConfigError::Invalid {
        name: "ADMIN_PASSWORD",
        reason: e.to_string(),
    })
}

fn env_or(name: &'static str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_required(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn env_parse<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
