//! Caller identity from gateway headers.
//!
//! Authentication happens upstream; the gateway forwards the organization in
//! `x-org-id` and, for user-initiated calls, the user in `x-user-id`.

use crate::error::ErrorResponse;
use axum::extract::FromRequestParts;
use axum::http::{request::Parts, StatusCode};
use axum::Json;
use docvault_core::IdentityContext;
use uuid::Uuid;

pub const ORG_ID_HEADER: &str = "x-org-id";
pub const USER_ID_HEADER: &str = "x-user-id";

/// Extractor for the org-scoped identity every document route requires.
#[derive(Debug, Clone, Copy)]
pub struct Identity(pub IdentityContext);

type Rejection = (StatusCode, Json<ErrorResponse>);

fn reject(status: StatusCode, message: &str, code: &str) -> Rejection {
    (status, Json(ErrorResponse::new(message, code)))
}

fn header_uuid(parts: &Parts, name: &str) -> Result<Option<Uuid>, Rejection> {
    let Some(value) = parts.headers.get(name) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
        .map(Some)
        .ok_or_else(|| {
            reject(
                StatusCode::BAD_REQUEST,
                &format!("Header {} must be a UUID", name),
                "INVALID_IDENTITY",
            )
        })
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let org_id = header_uuid(parts, ORG_ID_HEADER)?.ok_or_else(|| {
            reject(
                StatusCode::UNAUTHORIZED,
                "Missing organization identity",
                "UNAUTHORIZED",
            )
        })?;
        let user_id = header_uuid(parts, USER_ID_HEADER)?;
        Ok(Identity(IdentityContext::new(org_id, user_id)))
    }
}
