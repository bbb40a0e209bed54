//! Document lifecycle: placeholder, upload, versioning, rollback, download.

pub mod fingerprint;
pub mod locks;
pub mod service;
mod storage_errors;

pub use locks::RecordLocks;
pub use service::{DocumentDownload, DocumentService, DocumentServiceSettings, DownloadTarget};
