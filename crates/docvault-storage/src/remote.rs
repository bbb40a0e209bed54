//! Helpers shared by the `object_store` backed vendors.

use crate::traits::{ByteStream, ObjectInfo, PutResult, StorageError, StorageResult};
use crate::keys;
use bytes::Bytes;
use futures::StreamExt;
use http::Method;
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::Error as ObjectStoreError;
use object_store::{ClientOptions, ObjectStoreExt, PutPayload, Result as ObjectResult};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Client options applied to every remote vendor: bounds each network call.
pub(crate) fn client_options(request_timeout: Duration) -> ClientOptions {
    ClientOptions::new()
        .with_timeout(request_timeout)
        .with_connect_timeout(request_timeout)
}

/// Validate a key and convert it to an `object_store` path.
pub(crate) fn object_path(key: &str) -> StorageResult<Path> {
    keys::validate_key(key)?;
    Ok(Path::from(key.to_string()))
}

/// HTTP-ish status for backend errors that carry one, for diagnostics.
pub(crate) fn backend_status(err: &ObjectStoreError) -> Option<u16> {
    match err {
        ObjectStoreError::NotFound { .. } => Some(404),
        ObjectStoreError::PermissionDenied { .. } => Some(403),
        ObjectStoreError::Unauthenticated { .. } => Some(401),
        ObjectStoreError::AlreadyExists { .. } => Some(409),
        ObjectStoreError::Precondition { .. } => Some(412),
        _ => None,
    }
}

/// Uniform put/get/head/delete/presign over any `object_store` backend.
///
/// `label` names the vendor in log lines, `container` is the bucket or
/// container name.
pub(crate) struct RemoteOps<'a, S> {
    pub store: &'a S,
    pub label: &'static str,
    pub container: &'a str,
    pub request_timeout: Duration,
}

impl<S> RemoteOps<'_, S>
where
    S: ObjectStoreExt + Signer + Sync,
{
    pub async fn put(&self, key: &str, data: Bytes) -> StorageResult<PutResult> {
        let location = object_path(key)?;
        let size = data.len() as u64;
        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self.store.put(&location, PutPayload::from(data)).await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                vendor = self.label,
                container = %self.container,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Storage upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            vendor = self.label,
            container = %self.container,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Storage upload successful"
        );

        Ok(PutResult {
            vendor_path: key.to_string(),
            size_in_bytes: size,
        })
    }

    pub async fn get(&self, key: &str) -> StorageResult<ByteStream> {
        let location = object_path(key)?;
        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self.store.get(&location).await;

        let result = result.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(key.to_string()),
            other => {
                tracing::error!(
                    error = %other,
                    vendor = self.label,
                    container = %self.container,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Storage download failed"
                );
                StorageError::DownloadFailed(other.to_string())
            }
        })?;

        let label = self.label;
        let key = key.to_string();
        let stream = result.into_stream().map(move |res| {
            res.map_err(|e| {
                tracing::error!(
                    error = %e,
                    vendor = label,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Storage stream download error"
                );
                StorageError::DownloadFailed(e.to_string())
            })
        });

        Ok(Box::pin(stream))
    }

    pub async fn head(&self, key: &str) -> StorageResult<ObjectInfo> {
        let location = object_path(key)?;
        match self.store.head(&location).await {
            Ok(meta) => Ok(ObjectInfo {
                size_in_bytes: meta.size as u64,
            }),
            Err(ObjectStoreError::NotFound { .. }) => Err(StorageError::NotFound(key.to_string())),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    pub async fn delete(&self, key: &str) -> StorageResult<()> {
        let location = object_path(key)?;
        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self.store.delete(&location).await;

        match result {
            Ok(()) | Err(ObjectStoreError::NotFound { .. }) => {
                tracing::info!(
                    vendor = self.label,
                    container = %self.container,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Storage delete successful"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    vendor = self.label,
                    container = %self.container,
                    key = %key,
                    "Storage delete failed"
                );
                Err(StorageError::DeleteFailed(e.to_string()))
            }
        }
    }

    /// Sign a URL, bounded by the request timeout.
    pub async fn presign(
        &self,
        method: Method,
        key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        let location = object_path(key)?;
        bounded_presign(
            self.label,
            key,
            &method,
            self.request_timeout,
            self.store.signed_url(method.clone(), &location, expires_in),
        )
        .await
    }
}

/// Await a signing future for at most `timeout`. A timeout is reported as a
/// presign failure without a status.
pub(crate) async fn bounded_presign<F, U>(
    label: &'static str,
    key: &str,
    method: &Method,
    timeout: Duration,
    sign: F,
) -> StorageResult<String>
where
    F: Future<Output = ObjectResult<U>>,
    U: Display,
{
    match tokio::time::timeout(timeout, sign).await {
        Ok(Ok(url)) => Ok(url.to_string()),
        Ok(Err(e)) => {
            tracing::warn!(
                error = %e,
                vendor = label,
                key = %key,
                method = %method,
                "Presign request rejected"
            );
            Err(StorageError::PresignFailed {
                status: backend_status(&e),
                message: e.to_string(),
            })
        }
        Err(_) => {
            tracing::warn!(
                vendor = label,
                key = %key,
                timeout_ms = timeout.as_millis() as u64,
                "Presign request timed out"
            );
            Err(StorageError::PresignFailed {
                status: None,
                message: format!("timed out after {}ms", timeout.as_millis()),
            })
        }
    }
}
