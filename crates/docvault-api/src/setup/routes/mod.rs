//! Route configuration and setup.

mod health;

use crate::constants::API_PREFIX;
use crate::error::ErrorResponse;
use crate::handlers::{documents, download};
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Build the full application router.
///
/// `max_upload_bytes` caps every request body; larger uploads are answered
/// with 413 before they reach a handler.
pub fn build_router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    let documents = document_routes();

    Router::new()
        .route("/health", get(health::health_check))
        .nest(API_PREFIX, documents)
        .fallback(not_found)
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn document_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/documents", post(documents::create_document))
        .route(
            "/documents/{id}",
            get(documents::get_document).delete(documents::delete_document),
        )
        .route(
            "/documents/{id}/versions",
            get(documents::list_versions).post(documents::upload_version),
        )
        .route(
            "/documents/{id}/content",
            put(documents::upload_content).get(download::download_content),
        )
        .route("/documents/{id}/upload-url", post(documents::direct_upload_url))
        .route(
            "/documents/{id}/upload-complete",
            post(documents::complete_direct_upload),
        )
        .route("/documents/{id}/rollback", post(documents::rollback))
        .route("/documents/{id}/is-modified", post(documents::is_modified))
        .route("/documents/{id}/download-url", get(documents::download_url))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new("Route not found", "NOT_FOUND")),
    )
}
