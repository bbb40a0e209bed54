//! Document record store contract.

use async_trait::async_trait;
use docvault_core::{AppError, DocumentRecord, DocumentVersion};
use uuid::Uuid;

/// Version entry written together with a record update.
#[derive(Debug, Clone)]
pub enum VersionWrite {
    /// New entry for a versioned document. Fails with `Conflict` if the
    /// ordinal is already taken.
    Append(DocumentVersion),
    /// Insert or overwrite (by id) the single entry of an un-versioned document.
    Replace(DocumentVersion),
}

impl VersionWrite {
    pub fn version(&self) -> &DocumentVersion {
        match self {
            VersionWrite::Append(v) | VersionWrite::Replace(v) => v,
        }
    }
}

/// One atomic mutation of a document record.
///
/// Only the mutable columns of `record` are written: `document_path`,
/// `size_in_bytes`, `state`, `current_version_id` and `is_deleted`. The commit
/// succeeds only if the stored `lock_version` still equals
/// `expected_lock_version`; the stored counter is then incremented.
#[derive(Debug, Clone)]
pub struct DocumentChange {
    pub record: DocumentRecord,
    pub expected_lock_version: i64,
    pub version: Option<VersionWrite>,
}

impl DocumentChange {
    /// Change based on `record` as it was loaded.
    pub fn from_loaded(record: DocumentRecord) -> Self {
        let expected_lock_version = record.lock_version;
        Self {
            record,
            expected_lock_version,
            version: None,
        }
    }

    pub fn with_version(mut self, version: VersionWrite) -> Self {
        self.version = Some(version);
        self
    }
}

/// Persistent metadata store: one record per document, one entry per version.
///
/// Every lookup is scoped by organization. A record owned by another organization
/// is indistinguishable from a missing one.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Persist a new record.
    async fn insert(&self, record: &DocumentRecord) -> Result<DocumentRecord, AppError>;

    /// Fetch a live (not soft-deleted) record.
    async fn get(&self, org_id: Uuid, id: Uuid) -> Result<Option<DocumentRecord>, AppError>;

    /// Fetch a record regardless of its soft-delete flag.
    async fn get_including_deleted(
        &self,
        org_id: Uuid,
        id: Uuid,
    ) -> Result<Option<DocumentRecord>, AppError>;

    /// All versions of a document, ordered by ascending ordinal.
    async fn list_versions(
        &self,
        org_id: Uuid,
        document_id: Uuid,
    ) -> Result<Vec<DocumentVersion>, AppError>;

    /// Apply `change` atomically.
    ///
    /// Fails with `NotFound` if the record is missing, deleted or owned by another
    /// organization, and with `Conflict` if its `lock_version` moved on.
    async fn commit(&self, change: DocumentChange) -> Result<DocumentRecord, AppError>;
}

pub(crate) fn lock_conflict(id: Uuid) -> AppError {
    AppError::Conflict(format!("Document {} was modified concurrently", id))
}

pub(crate) fn version_conflict(id: Uuid, version_number: i32) -> AppError {
    AppError::Conflict(format!(
        "Version {} of document {} already exists",
        version_number, id
    ))
}
