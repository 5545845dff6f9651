//! Bearer-token authentication for the admin API.
//!
//! Tokens are HS256-signed JWTs carrying a [`Claims`] payload with an
//! `admin` flag. The [`AdminAuth`] layer gates the admin routes:
//!
//! - missing or malformed `Authorization` header → 401
//! - invalid signature or expired token → 401
//! - valid token without the admin flag → 403
//! - otherwise the decoded claims are attached to the request extensions
//!   and the request proceeds
//!
//! Password verification uses Argon2id PHC hashes; plaintext credentials
//! are never compared directly.
//!
//! # Example
//!
//! ```rust,ignore
//! let auth = AdminAuth::new(&config.auth);
//! let admin = Router::new()
//!     .route("/stats", get(stats))
//!     .layer(auth.layer());
//! ```

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::{
    sync::Arc,
    task::{Context, Poll},
};
use tower::{Layer, Service};
use tracing::{debug, warn};

use crate::config::AuthConfig;

/// Claims embedded in every bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject -- the authenticated username
    pub sub: String,
    /// Administrator flag; required by all gated routes
    pub admin: bool,
    /// Issued-at (UTC Unix timestamp)
    pub iat: i64,
    /// Expiration (UTC Unix timestamp)
    pub exp: i64,
}

/// Generate a signed bearer token for the given username.
///
/// Expiry is `token_expiry_mins` minutes from issuance.
pub fn issue_token(
    username: &str,
    config: &AuthConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: username.to_string(),
        admin: true,
        iat: now,
        exp: now + config.token_expiry_mins * 60,
    };

    encode(
        &Header::default(), // HS256
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
}

/// Validate a bearer token and return the embedded [`Claims`].
///
/// Signature and expiration are checked automatically.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(), // HS256, validates exp
    )?;
    Ok(token_data.claims)
}

/// Hash a plaintext password using Argon2id with a random salt.
///
/// Returns the PHC-formatted hash string.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a plaintext password against a stored PHC-formatted hash.
///
/// Returns `Ok(true)` on match, `Ok(false)` on mismatch.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Admin bearer-token gate
#[derive(Clone)]
pub struct AdminAuth {
    secret: Arc<str>,
}

impl AdminAuth {
    /// Create a new gate from the auth configuration
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            secret: Arc::from(config.jwt_secret.as_str()),
        }
    }

    /// Create a Tower Layer for this gate
    pub fn layer(&self) -> AdminAuthLayer {
        AdminAuthLayer { auth: self.clone() }
    }
}

/// Tower Layer for admin authentication
#[derive(Clone)]
pub struct AdminAuthLayer {
    auth: AdminAuth,
}

impl<S> Layer<S> for AdminAuthLayer {
    type Service = AdminAuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AdminAuthMiddleware {
            inner,
            auth: self.auth.clone(),
        }
    }
}

/// Admin authentication middleware service
#[derive(Clone)]
pub struct AdminAuthMiddleware<S> {
    inner: S,
    auth: AdminAuth,
}

impl<S> Service<Request<Body>> for AdminAuthMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let path = req.uri().path().to_string();
        let secret = self.auth.secret.clone();
        let mut inner = self.inner.clone();

        let token = extract_bearer_token(&req);

        Box::pin(async move {
            let token = match token {
                Some(t) => t,
                None => {
                    warn!(path = %path, "Missing or malformed Authorization header");
                    return Ok(unauthorized_response("Bearer token required"));
                }
            };

            let claims = match verify_token(&token, &secret) {
                Ok(claims) => claims,
                Err(e) => {
                    warn!(path = %path, error = %e, "Token verification failed");
                    return Ok(unauthorized_response("Invalid or expired token"));
                }
            };

            if !claims.admin {
                warn!(path = %path, sub = %claims.sub, "Token lacks admin privilege");
                return Ok(forbidden_response("Administrator privilege required"));
            }

            debug!(path = %path, sub = %claims.sub, "Admin authentication successful");
            req.extensions_mut().insert(claims);
            inner.call(req).await
        })
    }
}

/// Extract a bearer token from the `Authorization` header
fn extract_bearer_token<B>(req: &Request<B>) -> Option<String> {
    let auth_header = req.headers().get("authorization")?;
    let auth_str = auth_header.to_str().ok()?;
    auth_str.strip_prefix("Bearer ").map(|t| t.to_string())
}

/// Create a 401 response
fn unauthorized_response(message: &str) -> Response {
    let body = serde_json::json!({
        "error": "unauthorized",
        "message": message,
        "status": 401
    });

    (
        StatusCode::UNAUTHORIZED,
        [
            ("content-type", "application/json"),
            ("www-authenticate", "Bearer"),
        ],
        body.to_string(),
    )
        .into_response()
}

/// Create a 403 response
fn forbidden_response(message: &str) -> Response {
    let body = serde_json::json!({
        "error": "forbidden",
        "message": message,
        "status": 403
    });

    (
        StatusCode::FORBIDDEN,
        [("content-type", "application/json")],
        body.to_string(),
    )
        .into_response()
}
