//! Docvault Services Layer
//!
//! This crate is the **business service layer**: the document service that
//! validates input, drives the storage vendor adapters and commits record-store
//! changes. Keep orchestration here; keep thin HTTP handling in docvault-api.

pub mod documents;

pub use docvault_storage::{
    create_registry, ByteStream, LocalStorage, ObjectInfo, PutResult, Storage, StorageError,
    StorageRegistry, StorageResult,
};
pub use documents::{
    DocumentDownload, DocumentService, DocumentServiceSettings, DownloadTarget, RecordLocks,
};
