//! # Request Trace IDs
//!
//! Every request runs inside a span carrying a trace id. The id is taken
//! from the `CIO-TraceID` request header when present, otherwise a fresh
//! UUID v4, and is echoed back on the response under the same header.

use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;
use uuid::Uuid;

/// Header carrying the trace id, in both directions.
pub static TRACE_ID_HEADER: HeaderName = HeaderName::from_static("cio-traceid");

/// Trace id of the current request, available in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceId(pub String);

pub async fn trace_id_middleware(mut request: Request, next: Next) -> Response {
    let trace_id = request
        .headers()
        .get(&TRACE_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    request.extensions_mut().insert(TraceId(trace_id.clone()));

    let span = tracing::info_span!("request", trace_id = %trace_id);
    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&trace_id) {
        response.headers_mut().insert(TRACE_ID_HEADER.clone(), value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::{Extension, Router};
    use tower::ServiceExt;

    fn test_app() -> Router {
        Router::new()
            .route(
                "/echo",
                get(|Extension(TraceId(id)): Extension<TraceId>| async move { id }),
            )
            .layer(from_fn(trace_id_middleware))
    }

    #[tokio::test]
    async fn incoming_trace_id_is_echoed() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/echo")
                    .header("CIO-TraceID", "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()[&TRACE_ID_HEADER], "abc-123");
    }

    #[tokio::test]
    async fn missing_trace_id_is_generated() {
        let response = test_app()
            .oneshot(Request::builder().uri("/echo").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let id = response.headers()[&TRACE_ID_HEADER].to_str().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
    }
}
