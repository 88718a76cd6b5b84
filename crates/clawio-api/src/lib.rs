//! # clawio-api: HTTP Transport for the Data Service
//!
//! Exposes [`clawio_store::BlobStore`] over HTTP with Axum/Tower/Tokio.
//!
//! ## API Surface
//!
//! | Route | Auth | Purpose |
//! |---|---|---|
//! | `PUT /clawio/v1/data/upload/{*path}` | token | store the body at `path` |
//! | `GET /clawio/v1/data/download/{*path}` | token | stream the blob at `path` |
//! | `GET /health/liveness` | none | process is up |
//! | `GET /health/readiness` | none | ready to serve |
//! | `GET /metrics` | none | Prometheus scrape |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceIdMiddleware → TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```
//!
//! ## Crate Policy
//!
//! - No storage logic in route handlers; everything delegates to
//!   `clawio-store`.
//! - All errors map to structured HTTP responses via `AppError`.

pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::middleware::from_fn;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::state::AppState;

pub use config::AppConfig;
pub use error::AppError;

/// URL prefix of the blob routes.
pub const API_PREFIX: &str = "/clawio/v1/data";

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`) and `/metrics` are mounted outside the auth
/// middleware so they remain accessible without credentials. Only the blob
/// routes are instrumented.
pub fn app(state: AppState, auth: AuthConfig) -> Router {
    let metrics = state.metrics.clone();

    let api = Router::new()
        .nest(API_PREFIX, routes::blobs::router())
        .route_layer(from_fn(auth::auth_middleware))
        .route_layer(axum::Extension(auth))
        .route_layer(from_fn(middleware::metrics::metrics_middleware))
        .route_layer(axum::Extension(metrics.clone()))
        .with_state(state);

    let unauthenticated = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness))
        .route(
            "/metrics",
            axum::routing::get(middleware::metrics::metrics_handler),
        )
        .layer(axum::Extension(metrics));

    Router::new()
        .merge(unauthenticated)
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(middleware::trace_id::trace_id_middleware))
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: returns 200 when the application is ready to serve.
async fn readiness() -> &'static str {
    "ready"
}
