//! Common test utilities and helpers.
//!
//! Integration tests need a PostgreSQL instance; they read its URL from
//! `TEST_DATABASE_URL` and skip (returning early) when it is unset. Tests
//! within one binary are serialized through a global lock because they all
//! share the `media` table, which is truncated on server start.

#![allow(dead_code)]

use std::sync::OnceLock;
use std::time::Duration;

use media_gallery_server::config::{
    AuthConfig, CdnConfig, Config, DatabaseConfig, LoggingConfig, ServerConfig, UploadConfig,
};
use media_gallery_server::middleware::auth::hash_password;
use media_gallery_server::{create_router, AppState};

/// Password matching the hash baked into the test config
pub const TEST_PASSWORD: &str = "test-password";

/// Signing secret baked into the test config
pub const TEST_JWT_SECRET: &str = "test-secret-that-is-long-enough-for-hmac";

static DB_LOCK: OnceLock<tokio::sync::Mutex<()>> = OnceLock::new();

async fn db_lock() -> tokio::sync::MutexGuard<'static, ()> {
    DB_LOCK
        .get_or_init(|| tokio::sync::Mutex::new(()))
        .lock()
        .await
}

/// Test server options
#[derive(Default)]
pub struct TestOptions {
    /// CDN API base to configure; `None` leaves the CDN unconfigured
    pub cdn_base: Option<String>,
}

/// Test server instance
pub struct TestServer {
    pub base_url: String,
    pub pool: sqlx::PgPool,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    _guard: tokio::sync::MutexGuard<'static, ()>,
}

impl TestServer {
    /// Start a test server, or `None` when `TEST_DATABASE_URL` is unset
    pub async fn try_start() -> Option<Self> {
        Self::try_start_with(TestOptions::default()).await
    }

    /// Start a test server with explicit options
    pub async fn try_start_with(options: TestOptions) -> Option<Self> {
        let Ok(db_url) = std::env::var("TEST_DATABASE_URL") else {
            eprintln!("TEST_DATABASE_URL not set; skipping integration test");
            return None;
        };

        let guard = db_lock().await;

        let config = test_config(&db_url, options);
        let state = AppState::new(config)
            .await
            .expect("Failed to create app state");

        // Separate pool for seeding and assertions
        let pool = sqlx::PgPool::connect(&db_url)
            .await
            .expect("Failed to connect assertion pool");
        sqlx::query("TRUNCATE media RESTART IDENTITY")
            .execute(&pool)
            .await
            .expect("Failed to truncate media table");

        let app = create_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Failed to get local address");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("Test server failed");
        });

        Some(Self {
            base_url: format!("http://{addr}"),
            pool,
            shutdown_tx: Some(shutdown_tx),
            _guard: guard,
        })
    }

    /// Get HTTP client
    pub fn client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap()
    }

    /// Build a full URL for a path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Log in as the configured admin and return the bearer token
    pub async fn login(&self) -> String {
        let response = self
            .client()
            .post(self.url("/api/admin/login"))
            .json(&serde_json::json!({
                "username": "admin",
                "password": TEST_PASSWORD,
            }))
            .send()
            .await
            .expect("Login request failed");

        assert_eq!(response.status(), 200, "login should succeed");
        let body: serde_json::Value = response.json().await.unwrap();
        body["token"].as_str().expect("token in response").to_string()
    }

    /// Insert a media row directly and return its id
    pub async fn seed_media(
        &self,
        title: &str,
        category: &str,
        media_type: &str,
        visible: bool,
        views: i64,
    ) -> i64 {
        sqlx::query_scalar(
            "INSERT INTO media (title, category, url, media_type, views, visible) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
        )
        .bind(title)
        .bind(category)
        .bind(format!("https://cdn.example.test/seed/{title}"))
        .bind(media_type)
        .bind(views)
        .bind(visible)
        .fetch_one(&self.pool)
        .await
        .expect("Failed to seed media row")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Create test configuration
fn test_config(db_url: &str, options: TestOptions) -> Config {
    let cdn = match options.cdn_base {
        Some(api_base) => CdnConfig {
            cloud_name: Some("testcloud".to_string()),
            api_key: Some("test-key".to_string()),
            api_secret: Some("test-secret".to_string()),
            api_base,
            upload_timeout_secs: 10,
        },
        None => CdnConfig {
            cloud_name: None,
            api_key: None,
            api_secret: None,
            api_base: "https://api.example.test/v1_1".to_string(),
            upload_timeout_secs: 10,
        },
    };

    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseConfig {
            url: db_url.to_string(),
            max_connections: 5,
        },
        auth: AuthConfig {
            admin_username: "admin".to_string(),
            admin_password_hash: hash_password(TEST_PASSWORD).unwrap(),
            jwt_secret: TEST_JWT_SECRET.to_string(),
            token_expiry_mins: 60,
        },
        cdn,
        upload: UploadConfig {
            max_files: 100,
            max_file_size: 50 * 1024 * 1024,
            allowed_mime_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/gif".to_string(),
                "image/webp".to_string(),
            ],
        },
        logging: LoggingConfig {
            level: "warn".to_string(),
            format: "pretty".to_string(),
        },
    }
}

/// Start a mock CDN upload endpoint and return its base URL.
///
/// Accepts the same multipart shape the real CDN does and answers with a
/// `secure_url` derived from the submitted `public_id`.
pub async fn start_mock_cdn() -> String {
    use axum::extract::{Multipart, Path};
    use axum::routing::post;
    use axum::{Json, Router};

    async fn upload(
        Path(_cloud): Path<String>,
        mut multipart: Multipart,
    ) -> Json<serde_json::Value> {
        let mut public_id = String::new();
        let mut folder = String::new();

        while let Some(field) = multipart.next_field().await.unwrap() {
            let name = field.name().unwrap_or("").to_string();
            match name.as_str() {
                "public_id" => public_id = field.text().await.unwrap(),
                "folder" => folder = field.text().await.unwrap(),
                _ => {
                    let _ = field.bytes().await;
                }
            }
        }

        Json(serde_json::json!({
            "secure_url": format!("https://cdn.example.test/{folder}/{public_id}"),
            "public_id": format!("{folder}/{public_id}"),
        }))
    }

    let app = Router::new().route("/{cloud}/image/upload", post(upload));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock CDN listener");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Mock CDN failed");
    });

    format!("http://{addr}")
}
