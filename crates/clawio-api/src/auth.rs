//! # Authentication Middleware
//!
//! Resolves a request token to a verified [`Identity`] and injects it into
//! the request extensions as a [`CallerIdentity`].
//!
//! ## Token Sources
//!
//! Checked in order, first hit wins:
//!
//! ```text
//! token: <token>  dedicated header
//! Authorization: Bearer <token>  standard bearer scheme
//! ?token=<token>  query parameter
//! ```
//!
//! ## Verifiers
//!
//! Token checking is delegated to an [`IdentityVerifier`] trait object, so a
//! deployment can plug in a remote auth service. [`StaticTokenVerifier`]
//! maps a fixed token table to usernames.
//!
//! ## Security Invariant
//!
//! There is no unauthenticated mode. A request without a token that the
//! verifier accepts never reaches a blob handler.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Query, Request};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use clawio_core::Identity;
use serde::Deserialize;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::error::{AppError, ErrorBody, ErrorDetail};

/// Dedicated token header.
pub const TOKEN_HEADER: &str = "token";

// ── Verifier ────────────────────────────────────────────────────────────────

/// Why a token was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid token")]
    InvalidToken,
}

/// Turns an opaque token into a verified identity.
#[async_trait]
pub trait IdentityVerifier: Send + Sync + 'static {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}

/// Verifier over a fixed `token -> identity` table.
///
/// Custom `Debug` redacts the tokens.
#[derive(Clone, Default)]
pub struct StaticTokenVerifier {
    entries: Vec<(String, Identity)>,
}

impl StaticTokenVerifier {
    /// Build from `(token, username)` pairs. Fails on an invalid username.
    pub fn from_pairs<I, T, U>(pairs: I) -> Result<Self, clawio_core::CoreError>
    where
        I: IntoIterator<Item = (T, U)>,
        T: Into<String>,
        U: Into<String>,
    {
        let entries = pairs
            .into_iter()
            .map(|(token, user)| Ok((token.into(), Identity::new(user)?)))
            .collect::<Result<Vec<_>, clawio_core::CoreError>>()?;
        Ok(Self { entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for StaticTokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticTokenVerifier")
            .field("tokens", &self.entries.len())
            .finish()
    }
}

#[async_trait]
impl IdentityVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        // Scan the whole table so timing does not reveal which entry matched.
        let mut found = None;
        for (candidate, identity) in &self.entries {
            if constant_time_token_eq(token, candidate) && found.is_none() {
                found = Some(identity);
            }
        }
        found.cloned().ok_or(AuthError::InvalidToken)
    }
}

/// Constant-time comparison of tokens.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// The authenticated caller, available to handlers via `FromRequestParts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity(pub Identity);

impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// Auth configuration injected into request extensions.
#[derive(Clone)]
pub struct AuthConfig {
    pub verifier: Arc<dyn IdentityVerifier>,
}

impl AuthConfig {
    pub fn new(verifier: impl IdentityVerifier) -> Self {
        Self {
            verifier: Arc::new(verifier),
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig").finish_non_exhaustive()
    }
}

// ── Token Extraction ────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Pull the request token from header, bearer, or query string.
pub fn extract_token(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    let non_empty = |s: &str| {
        let s = s.trim();
        (!s.is_empty()).then(|| s.to_string())
    };

    if let Some(token) = headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(non_empty)
    {
        return Some(token);
    }

    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(non_empty)
    {
        return Some(token);
    }

    Query::<TokenQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(q)| q.token)
        .as_deref()
        .and_then(non_empty)
}

// ── Middleware ──────────────────────────────────────────────────────────────

/// Authenticate the request and inject [`CallerIdentity`].
///
/// Requires an [`AuthConfig`] extension layered outside this middleware;
/// without one every request is rejected.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let Some(config) = request.extensions().get::<AuthConfig>().cloned() else {
        tracing::error!("auth middleware installed without AuthConfig");
        return unauthorized_response("authentication is not configured");
    };

    let Some(token) = extract_token(request.headers(), request.uri()) else {
        tracing::warn!("authentication failed: missing token");
        return unauthorized_response("missing token");
    };

    match config.verifier.verify(&token).await {
        Ok(identity) => {
            tracing::debug!(user = %identity, "authenticated");
            request.extensions_mut().insert(CallerIdentity(identity));
            next.run(request).await
        }
        Err(e) => {
            tracing::warn!(reason = %e, "authentication failed");
            unauthorized_response("invalid token")
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::Router;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn verifier() -> StaticTokenVerifier {
        StaticTokenVerifier::from_pairs([("tok-alice", "alice"), ("tok-bob", "bob")]).unwrap()
    }

    /// Minimal router that echoes the authenticated username.
    fn test_app() -> Router {
        Router::new()
            .route(
                "/whoami",
                get(|CallerIdentity(id): CallerIdentity| async move { id.username().to_string() }),
            )
            .layer(from_fn(auth_middleware))
            .layer(axum::Extension(AuthConfig::new(verifier())))
    }

    async fn send(request: Request<Body>) -> (StatusCode, String) {
        let response = test_app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn token_header_accepted() {
        let (status, body) = send(
            Request::builder()
                .uri("/whoami")
                .header("token", "tok-alice")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "alice");
    }

    #[tokio::test]
    async fn bearer_token_accepted() {
        let (status, body) = send(
            Request::builder()
                .uri("/whoami")
                .header("authorization", "Bearer tok-bob")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "bob");
    }

    #[tokio::test]
    async fn query_token_accepted() {
        let (status, body) = send(
            Request::builder()
                .uri("/whoami?token=tok-alice")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "alice");
    }

    #[tokio::test]
    async fn header_wins_over_query() {
        let (_, body) = send(
            Request::builder()
                .uri("/whoami?token=tok-bob")
                .header("token", "tok-alice")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(body, "alice");
    }

    #[tokio::test]
    async fn missing_token_rejected() {
        let (status, body) = send(Request::builder().uri("/whoami").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("UNAUTHORIZED"));
    }

    #[tokio::test]
    async fn unknown_token_rejected() {
        let (status, _) = send(
            Request::builder()
                .uri("/whoami")
                .header("token", "tok-mallory")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn non_bearer_scheme_rejected() {
        let (status, _) = send(
            Request::builder()
                .uri("/whoami")
                .header("authorization", "Basic dG9rLWFsaWNl")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn empty_verifier_rejects_everything() {
        let app = Router::new()
            .route("/whoami", get(|| async { "unreachable" }))
            .layer(from_fn(auth_middleware))
            .layer(axum::Extension(AuthConfig::new(StaticTokenVerifier::default())));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/whoami")
                    .header("token", "anything")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn invalid_username_rejected_at_construction() {
        assert!(StaticTokenVerifier::from_pairs([("tok", "../root")]).is_err());
    }

    #[test]
    fn debug_redacts_tokens() {
        let debug = format!("{:?}", verifier());
        assert!(!debug.contains("tok-alice"));
    }

    #[test]
    fn constant_time_eq_works() {
        assert!(constant_time_token_eq("abc", "abc"));
        assert!(!constant_time_token_eq("abc", "abd"));
        assert!(!constant_time_token_eq("abc", "abcd"));
    }
}
