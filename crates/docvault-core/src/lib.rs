//! Docvault Core Library
//!
//! Domain models, the error taxonomy, configuration, input validation and vendor
//! selection shared by every docvault crate.

pub mod config;
pub mod content_disposition;
pub mod error;
pub mod identity;
pub mod models;
pub mod storage_types;
pub mod validation;
pub mod vendor;

// Re-export commonly used types
pub use config::{Config, StorageConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use identity::IdentityContext;
pub use models::{DocumentRecord, DocumentState, DocumentVersion, NewDocument, PresignedUpload};
pub use storage_types::StorageVendor;
pub use vendor::{StaticVendorSelector, VendorSelector, WatchedVendorSelector};
