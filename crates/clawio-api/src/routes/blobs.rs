//! # Blob Routes
//!
//! Thin adapters between HTTP and [`BlobStore`](clawio_store::BlobStore).
//! Request bodies are streamed into the store and blobs are streamed back
//! out; neither side is buffered in memory.

use std::io;

use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::Router;
use futures::TryStreamExt;
use serde::Deserialize;
use tokio_util::io::{ReaderStream, StreamReader};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::state::AppState;

/// Header carrying a client digest on upload and the server digest on the
/// response.
pub const CHECKSUM_HEADER: &str = "checksum";

/// Build the blob router. The framework body limit is disabled on upload;
/// the store enforces its own.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/upload/{*path}",
            put(upload).layer(DefaultBodyLimit::disable()),
        )
        .route("/download/{*path}", get(download))
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub checksum: Option<String>,
}

/// PUT /upload/{*path}: store the request body at `path`.
///
/// Responds 201 with the server digest in the `checksum` header when the
/// store computed one.
pub async fn upload(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    Path(path): Path<String>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, AppError> {
    let client_checksum = headers
        .get(CHECKSUM_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or(query.checksum);

    tracing::debug!(
        user = %identity,
        path = %path,
        storage = %state.store.storage_path(&identity, &path).display(),
        "upload requested"
    );

    let content = StreamReader::new(body.into_data_stream().map_err(io::Error::other));
    let limit = state.store.config().max_upload_size;
    let checksum = state
        .store
        .upload(&identity, &path, content, limit, client_checksum.as_deref())
        .await?;

    let mut response = StatusCode::CREATED.into_response();
    if let Some(checksum) = checksum {
        let value = HeaderValue::from_str(&checksum.to_string())
            .map_err(|e| AppError::Internal(format!("checksum header: {e}")))?;
        response.headers_mut().insert(CHECKSUM_HEADER, value);
    }
    Ok(response)
}

/// GET /download/{*path}: stream the blob at `path`.
pub async fn download(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    Path(path): Path<String>,
) -> Result<Response, AppError> {
    let reader = state.store.download(&identity, &path).await?;
    let len = reader.len();

    tracing::debug!(user = %identity, path = %path, len, "download started");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_LENGTH, len)
        .body(Body::from_stream(ReaderStream::new(reader)))
        .map_err(|e| AppError::Internal(format!("building download response: {e}")))
}
