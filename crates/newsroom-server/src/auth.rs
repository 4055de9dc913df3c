//! HTTP Basic authentication middleware.
//!
//! Every `/api` route except health requires the configured admin
//! credentials. Both halves are compared in constant time.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{
        HeaderValue, StatusCode,
        header::{AUTHORIZATION, WWW_AUTHENTICATE},
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::config::ServerConfig;
use crate::state::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Identity
// ─────────────────────────────────────────────────────────────────────────────

/// The authenticated caller, available to handlers as an extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth Error
// ─────────────────────────────────────────────────────────────────────────────

/// Authentication error.
#[derive(Debug, Clone)]
pub enum AuthError {
    /// Missing authorization header.
    MissingCredentials,
    /// Header present but not a decodable Basic credential.
    InvalidFormat,
    /// Username or password did not match.
    InvalidCredentials,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingCredentials => write!(f, "Missing credentials"),
            AuthError::InvalidFormat => write!(f, "Invalid authorization format"),
            AuthError::InvalidCredentials => write!(f, "Incorrect username or password"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self, "rejected request");

        let body = serde_json::json!({
            "code": "unauthorized",
            "message": self.to_string(),
        });

        let mut response = (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response();
        response
            .headers_mut()
            .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Basic"));
        response
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Security Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Compare two strings in constant time.
///
/// A length mismatch still performs a comparison so the timing does not
/// reveal how much of the secret matched.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    if a_bytes.len() == b_bytes.len() {
        a_bytes.ct_eq(b_bytes).into()
    } else {
        let _ = a_bytes.ct_eq(a_bytes);
        false
    }
}

/// Decode an `Authorization: Basic ...` value into `(username, password)`.
fn decode_basic(header: &str) -> Result<(String, String), AuthError> {
    let encoded = header
        .strip_prefix("Basic ")
        .ok_or(AuthError::InvalidFormat)?;
    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_| AuthError::InvalidFormat)?;
    let decoded = String::from_utf8(decoded).map_err(|_| AuthError::InvalidFormat)?;
    let (username, password) = decoded.split_once(':').ok_or(AuthError::InvalidFormat)?;
    Ok((username.to_string(), password.to_string()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Middleware
// ─────────────────────────────────────────────────────────────────────────────

/// Authentication middleware function.
///
/// Validates the request and injects the [`Identity`] into request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let identity = validate_request(&request, state.config())?;
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

fn validate_request(request: &Request<Body>, config: &ServerConfig) -> Result<Identity, AuthError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?;
    let header = header.to_str().map_err(|_| AuthError::InvalidFormat)?;
    let (username, password) = decode_basic(header)?;

    // Evaluate both before branching.
    let user_ok = constant_time_eq(&username, &config.admin_username);
    let pass_ok = constant_time_eq(&password, &config.admin_password);
    if user_ok & pass_ok {
        Ok(Identity { username })
    } else {
        Err(AuthError::InvalidCredentials)
    }
}
