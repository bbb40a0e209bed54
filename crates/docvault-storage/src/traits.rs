//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage vendors must implement.

use async_trait::async_trait;
use bytes::Bytes;
use docvault_core::StorageVendor;
use futures::Stream;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    /// A local locator resolved outside the storage root.
    #[error("Invalid storage path: {0}")]
    InvalidPath(String),

    #[error("Presign failed (status {status:?}): {message}")]
    PresignFailed {
        status: Option<u16>,
        message: String,
    },

    #[error("Operation not supported: {0}")]
    Unsupported(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Lazy, single-pass byte stream returned by [`Storage::get_object`].
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Outcome of a successful [`Storage::put_object`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutResult {
    /// Vendor locator to persist on the document record.
    pub vendor_path: String,
    pub size_in_bytes: u64,
}

/// Object metadata returned by [`Storage::head_object`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectInfo {
    pub size_in_bytes: u64,
}

/// Storage abstraction trait
///
/// Implemented by object storage (S3), blob storage (Azure) and the local
/// filesystem. Paths passed in are either keys produced by [`crate::keys`] or
/// locators previously returned from `put_object` for the same vendor.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Vendor this adapter writes to.
    fn vendor(&self) -> StorageVendor;

    /// Write `data` at `path`, overwriting any existing object.
    ///
    /// Callers choose between overwrite and a fresh versioned path by picking the key.
    async fn put_object(&self, path: &str, data: Bytes) -> StorageResult<PutResult>;

    /// Mint a time-limited URL a client can `PUT` content to directly.
    ///
    /// Returns [`StorageError::Unsupported`] for vendors without presigning.
    async fn generate_presigned_upload_url(
        &self,
        path: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Mint a time-limited URL a client can `GET` content from directly.
    async fn generate_presigned_download_url(
        &self,
        path: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Open the object at `path` as a byte stream.
    ///
    /// Fails with [`StorageError::NotFound`] if the object does not exist.
    async fn get_object(&self, path: &str) -> StorageResult<ByteStream>;

    /// Size of the object at `path`.
    async fn head_object(&self, path: &str) -> StorageResult<ObjectInfo>;

    /// Delete the object at `path`. A missing object is not an error.
    async fn delete_object(&self, path: &str) -> StorageResult<()>;
}
