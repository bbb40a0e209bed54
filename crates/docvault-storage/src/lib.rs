//! Docvault Storage Library
//!
//! The vendor adapter layer: the [`Storage`] trait and its three implementations,
//! object storage (S3), blob storage (Azure) and the local filesystem.
//!
//! # Storage key format
//!
//! Keys are org-scoped and generated in the `keys` module so every vendor uses
//! the same layout:
//!
//! - **Un-versioned**: `documents/{org_id}/{document_id}.{ext}`
//! - **Versioned**: `documents/{org_id}/{document_id}/{version_id}.{ext}`
//!
//! Keys must not contain `..`, empty segments or a leading `/`.

#[cfg(feature = "storage-azure")]
pub mod azure;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod registry;
#[cfg(any(feature = "storage-s3", feature = "storage-azure"))]
pub(crate) mod remote;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
#[cfg(feature = "storage-azure")]
pub use azure::{BlobStorage, BlobStorageSettings};
pub use docvault_core::StorageVendor;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use registry::{create_registry, StorageRegistry};
#[cfg(feature = "storage-s3")]
pub use s3::{ObjectStorage, ObjectStorageSettings};
pub use traits::{ByteStream, ObjectInfo, PutResult, Storage, StorageError, StorageResult};
