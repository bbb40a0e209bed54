use crate::error::{HttpAppError, ValidatedJson};
use crate::identity::Identity;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use docvault_core::NewDocument;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct VersionQuery {
    pub version_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct IsModifiedRequest {
    /// SHA-256 of the caller's copy, hex encoded.
    pub hash: String,
}

#[derive(Debug, Serialize)]
pub struct IsModifiedResponse {
    pub modified: bool,
}

#[derive(Debug, Serialize)]
pub struct DownloadUrlResponse {
    pub url: String,
}

#[tracing::instrument(
    skip(state, new),
    fields(org_id = %identity.org_id, user_id = ?identity.user_id, operation = "create_placeholder")
)]
pub async fn create_document(
    State(state): State<Arc<AppState>>,
    Identity(identity): Identity,
    ValidatedJson(new): ValidatedJson<NewDocument>,
) -> Result<impl IntoResponse, HttpAppError> {
    let record = state.documents.create_placeholder(&identity, new).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[tracing::instrument(skip(state), fields(org_id = %identity.org_id, document_id = %id))]
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Identity(identity): Identity,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let record = state.documents.get_document(&identity, id).await?;
    Ok(Json(record))
}

#[tracing::instrument(skip(state), fields(org_id = %identity.org_id, document_id = %id))]
pub async fn list_versions(
    State(state): State<Arc<AppState>>,
    Identity(identity): Identity,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let versions = state.documents.list_versions(&identity, id).await?;
    Ok(Json(versions))
}

/// Buffered upload; the request body is the raw file content.
#[tracing::instrument(
    skip(state, body),
    fields(org_id = %identity.org_id, document_id = %id, size_bytes = body.len(), operation = "upload_buffered")
)]
pub async fn upload_content(
    State(state): State<Arc<AppState>>,
    Identity(identity): Identity,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<impl IntoResponse, HttpAppError> {
    let record = state.documents.upload_buffered(&identity, id, body).await?;
    Ok(Json(record))
}

#[tracing::instrument(
    skip(state, body),
    fields(org_id = %identity.org_id, document_id = %id, size_bytes = body.len(), operation = "upload_next_version")
)]
pub async fn upload_version(
    State(state): State<Arc<AppState>>,
    Identity(identity): Identity,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<impl IntoResponse, HttpAppError> {
    let version = state
        .documents
        .upload_next_version(&identity, id, body)
        .await?;
    Ok((StatusCode::CREATED, Json(version)))
}

#[tracing::instrument(skip(state), fields(org_id = %identity.org_id, document_id = %id))]
pub async fn direct_upload_url(
    State(state): State<Arc<AppState>>,
    Identity(identity): Identity,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let presigned = state
        .documents
        .generate_direct_upload_url(&identity, id)
        .await?;
    Ok(Json(presigned))
}

#[tracing::instrument(skip(state), fields(org_id = %identity.org_id, document_id = %id))]
pub async fn complete_direct_upload(
    State(state): State<Arc<AppState>>,
    Identity(identity): Identity,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let record = state
        .documents
        .complete_direct_upload(&identity, id)
        .await?;
    Ok(Json(record))
}

#[tracing::instrument(skip(state), fields(org_id = %identity.org_id, document_id = %id))]
pub async fn rollback(
    State(state): State<Arc<AppState>>,
    Identity(identity): Identity,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let record = state
        .documents
        .roll_back_to_previous_version(&identity, id)
        .await?;
    Ok(Json(record))
}

#[tracing::instrument(skip(state, request), fields(org_id = %identity.org_id, document_id = %id))]
pub async fn is_modified(
    State(state): State<Arc<AppState>>,
    Identity(identity): Identity,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<IsModifiedRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let modified = state
        .documents
        .is_modified(&identity, id, &request.hash)
        .await?;
    Ok(Json(IsModifiedResponse { modified }))
}

#[tracing::instrument(skip(state), fields(org_id = %identity.org_id, document_id = %id))]
pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Identity(identity): Identity,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.documents.delete_document(&identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip(state), fields(org_id = %identity.org_id, document_id = %id))]
pub async fn download_url(
    State(state): State<Arc<AppState>>,
    Identity(identity): Identity,
    Path(id): Path<Uuid>,
    Query(query): Query<VersionQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let url = state
        .documents
        .generate_download_url(&identity, id, query.version_id)
        .await?;
    Ok(Json(DownloadUrlResponse { url }))
}
