//! Content download.
//!
//! Everything that can fail before the first byte (lookup, path resolution,
//! opening the object) is answered with a proper error status. Once headers are
//! out, a failing stream can only be logged and the connection cut.

use crate::error::HttpAppError;
use crate::handlers::documents::VersionQuery;
use crate::identity::Identity;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, Response, StatusCode},
    response::IntoResponse,
};
use bytes::Bytes;
use docvault_core::{AppError, StorageVendor};
use docvault_services::{DownloadTarget, StorageError};
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

#[tracing::instrument(
    skip(state, query),
    fields(org_id = %identity.org_id, document_id = %id, operation = "download")
)]
pub async fn download_content(
    State(state): State<Arc<AppState>>,
    Identity(identity): Identity,
    Path(id): Path<Uuid>,
    Query(query): Query<VersionQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let target = state
        .documents
        .resolve_download(&identity, id, query.version_id)
        .await?;

    if target.vendor() == StorageVendor::Local {
        return serve_local(&state, target).await;
    }

    let stream = state.documents.open_stream(&target).await?;
    tracing::debug!(
        vendor = %target.vendor(),
        version = target.version.version_number,
        "Proxying document from storage"
    );

    let size = target.version.size_in_bytes;
    let body = logged_body(stream, &target);
    build_response(&target, Some(size), body)
}

/// Stream a file from the local storage root.
///
/// The stored `file://` locator is resolved and checked against the root
/// before any filesystem access.
async fn serve_local(
    state: &AppState,
    target: DownloadTarget,
) -> Result<Response<Body>, HttpAppError> {
    let local = state.documents.storage().local().ok_or_else(|| {
        AppError::Internal("Local storage is not configured".to_string())
    })?;

    let (file, length) = local.open(target.path()).await.map_err(|e| match e {
        StorageError::InvalidPath(message) | StorageError::InvalidKey(message) => {
            tracing::warn!(
                document_id = %target.record.id,
                reason = %message,
                "Rejected local path outside storage root"
            );
            AppError::InvalidPath("Document path is not within the storage directory".to_string())
        }
        StorageError::NotFound(_) => {
            AppError::NotFound("Document content not found in storage".to_string())
        }
        other => AppError::StorageRead {
            vendor: StorageVendor::Local,
            path: target.path().to_string(),
            message: other.to_string(),
        },
    })?;

    let body = logged_body(ReaderStream::new(file), &target);
    build_response(&target, Some(length as i64), body)
}

fn build_response(
    target: &DownloadTarget,
    length: Option<i64>,
    body: Body,
) -> Result<Response<Body>, HttpAppError> {
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, target.content_type)
        .header(header::CONTENT_DISPOSITION, target.content_disposition.as_str())
        .header(header::CACHE_CONTROL, "private, no-store")
        .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff");
    if let Some(length) = length.filter(|l| *l >= 0) {
        builder = builder.header(header::CONTENT_LENGTH, length);
    }

    builder
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)).into())
}

/// Wrap a byte stream so a mid-transfer failure is logged with how far it got.
/// The error still ends the body, which aborts the connection.
fn logged_body<S, E>(stream: S, target: &DownloadTarget) -> Body
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display,
{
    let document_id = target.record.id;
    let vendor = target.vendor();
    let mut bytes_sent: u64 = 0;

    let stream = stream.map(move |chunk| match chunk {
        Ok(bytes) => {
            bytes_sent += bytes.len() as u64;
            Ok(bytes)
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                document_id = %document_id,
                vendor = %vendor,
                bytes_sent,
                "Download stream failed after headers were sent, aborting"
            );
            Err(std::io::Error::other(e.to_string()))
        }
    });

    Body::from_stream(stream)
}
