//! # Prometheus Metrics
//!
//! Per-route request counters and latency histograms, recorded by
//! [`metrics_middleware`] and scraped from `GET /metrics`.
//!
//! Series are labelled with the matched route template
//! (`/clawio/v1/data/upload/{*path}`), never the raw request path, so
//! cardinality stays bounded no matter which blob paths callers use.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Extension;
use prometheus::core::Collector;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

/// Label used when a request reached the middleware without a matched route.
const UNMATCHED_ROUTE: &str = "unmatched";

/// Shared metrics state backed by a private Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,
    requests_total: IntCounterVec,
    errors_total: IntCounterVec,
    request_duration_seconds: HistogramVec,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("requests", &self.requests())
            .field("errors", &self.errors())
            .finish()
    }
}

impl ApiMetrics {
    /// Create the collectors and register them in a fresh registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("clawio_data_http_requests_total", "Total HTTP requests"),
            &["method", "route", "status"],
        )?;
        let errors_total = IntCounterVec::new(
            Opts::new(
                "clawio_data_http_errors_total",
                "Total HTTP errors (4xx and 5xx)",
            ),
            &["method", "route", "status"],
        )?;
        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "clawio_data_http_request_duration_seconds",
                "HTTP request duration in seconds, up to response headers",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
            ]),
            &["method", "route"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(errors_total.clone()))?;
        registry.register(Box::new(request_duration_seconds.clone()))?;

        Ok(Self {
            inner: Arc::new(Inner {
                registry,
                requests_total,
                errors_total,
                request_duration_seconds,
            }),
        })
    }

    /// Total requests recorded, across all labels.
    pub fn requests(&self) -> u64 {
        sum_counter(&self.inner.requests_total)
    }

    /// Total 4xx/5xx responses recorded, across all labels.
    pub fn errors(&self) -> u64 {
        sum_counter(&self.inner.errors_total)
    }

    fn record_request(&self, method: &str, route: &str, status: StatusCode, duration_secs: f64) {
        let is_error = status.is_client_error() || status.is_server_error();
        let status = status.as_u16().to_string();
        self.inner
            .requests_total
            .with_label_values(&[method, route, &status])
            .inc();
        self.inner
            .request_duration_seconds
            .with_label_values(&[method, route])
            .observe(duration_secs);
        if is_error {
            self.inner
                .errors_total
                .with_label_values(&[method, route, &status])
                .inc();
        }
    }

    /// Encode every registered metric in the Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.inner.registry.gather(), &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer).map_err(|e| format!("metrics encoding produced invalid UTF-8: {e}"))
    }
}

fn sum_counter(counter: &IntCounterVec) -> u64 {
    counter
        .collect()
        .iter()
        .flat_map(|family| family.get_metric())
        .map(|m| m.get_counter().get_value() as u64)
        .sum()
}

/// Record method, matched route, status and latency for each request.
///
/// Must sit inside the router (`route_layer`) so [`MatchedPath`] is set,
/// and outside authentication so rejected requests are counted too.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string());
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        m.record_request(
            &method,
            &route,
            response.status(),
            start.elapsed().as_secs_f64(),
        );
    }

    response
}

/// GET /metrics: Prometheus scrape endpoint.
pub async fn metrics_handler(Extension(metrics): Extension<ApiMetrics>) -> Response {
    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    #[test]
    fn new_starts_at_zero() {
        let m = ApiMetrics::new().unwrap();
        assert_eq!(m.requests(), 0);
        assert_eq!(m.errors(), 0);
    }

    #[test]
    fn errors_count_only_4xx_and_5xx() {
        let m = ApiMetrics::new().unwrap();
        m.record_request("GET", "/a", StatusCode::OK, 0.01);
        m.record_request("PUT", "/a", StatusCode::CREATED, 0.01);
        m.record_request("GET", "/a", StatusCode::NOT_FOUND, 0.01);
        m.record_request("PUT", "/a", StatusCode::INTERNAL_SERVER_ERROR, 0.01);
        assert_eq!(m.requests(), 4);
        assert_eq!(m.errors(), 2);
    }

    #[test]
    fn gather_and_encode_produces_text() {
        let m = ApiMetrics::new().unwrap();
        m.record_request("GET", "/x", StatusCode::OK, 0.01);
        let output = m.gather_and_encode().unwrap();
        assert!(output.contains("clawio_data_http_requests_total"));
        assert!(output.contains("clawio_data_http_request_duration_seconds"));
    }

    #[test]
    fn registries_are_independent() {
        let a = ApiMetrics::new().unwrap();
        let b = ApiMetrics::new().unwrap();
        a.record_request("GET", "/x", StatusCode::OK, 0.01);
        assert_eq!(a.requests(), 1);
        assert_eq!(b.requests(), 0);
    }

    #[tokio::test]
    async fn middleware_labels_with_route_template() {
        let metrics = ApiMetrics::new().unwrap();
        let app = Router::new()
            .route("/items/{id}", get(|| async { "ok" }))
            .route_layer(from_fn(metrics_middleware))
            .route_layer(Extension(metrics.clone()));

        let response = app
            .oneshot(Request::builder().uri("/items/42").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let output = metrics.gather_and_encode().unwrap();
        assert!(output.contains(r#"route="/items/{id}""#));
        assert!(!output.contains("/items/42"));
        assert_eq!(metrics.requests(), 1);
    }
}
