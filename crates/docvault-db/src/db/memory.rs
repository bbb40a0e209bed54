//! In-memory document repository.
//!
//! Used by tests and when no `DATABASE_URL` is configured. Commits take the write
//! lock for their whole duration, so they are as atomic as the Postgres ones.

use async_trait::async_trait;
use chrono::Utc;
use docvault_core::{AppError, DocumentRecord, DocumentVersion};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repository::{
    lock_conflict, version_conflict, DocumentChange, DocumentRepository, VersionWrite,
};

#[derive(Debug, Clone)]
struct StoredDocument {
    record: DocumentRecord,
    versions: Vec<DocumentVersion>,
}

#[derive(Clone, Default)]
pub struct InMemoryDocumentRepository {
    documents: Arc<RwLock<HashMap<Uuid, StoredDocument>>>,
}

impl InMemoryDocumentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentRepository for InMemoryDocumentRepository {
    async fn insert(&self, record: &DocumentRecord) -> Result<DocumentRecord, AppError> {
        let mut documents = self.documents.write().await;
        if documents.contains_key(&record.id) {
            return Err(AppError::Conflict(format!(
                "Document {} already exists",
                record.id
            )));
        }
        documents.insert(
            record.id,
            StoredDocument {
                record: record.clone(),
                versions: Vec::new(),
            },
        );
        Ok(record.clone())
    }

    async fn get(&self, org_id: Uuid, id: Uuid) -> Result<Option<DocumentRecord>, AppError> {
        Ok(self
            .get_including_deleted(org_id, id)
            .await?
            .filter(|r| !r.is_deleted))
    }

    async fn get_including_deleted(
        &self,
        org_id: Uuid,
        id: Uuid,
    ) -> Result<Option<DocumentRecord>, AppError> {
        let documents = self.documents.read().await;
        Ok(documents
            .get(&id)
            .filter(|d| d.record.org_id == org_id)
            .map(|d| d.record.clone()))
    }

    async fn list_versions(
        &self,
        org_id: Uuid,
        document_id: Uuid,
    ) -> Result<Vec<DocumentVersion>, AppError> {
        let documents = self.documents.read().await;
        let mut versions = documents
            .get(&document_id)
            .filter(|d| d.record.org_id == org_id)
            .map(|d| d.versions.clone())
            .unwrap_or_default();
        versions.sort_by_key(|v| v.version_number);
        Ok(versions)
    }

    async fn commit(&self, change: DocumentChange) -> Result<DocumentRecord, AppError> {
        let mut documents = self.documents.write().await;
        let id = change.record.id;

        let stored = documents
            .get_mut(&id)
            .filter(|d| d.record.org_id == change.record.org_id && !d.record.is_deleted)
            .ok_or_else(|| AppError::document_not_found(id))?;

        if stored.record.lock_version != change.expected_lock_version {
            return Err(lock_conflict(id));
        }

        match change.version {
            Some(VersionWrite::Append(version)) => {
                if stored
                    .versions
                    .iter()
                    .any(|v| v.version_number == version.version_number)
                {
                    return Err(version_conflict(id, version.version_number));
                }
                stored.versions.push(version);
            }
            Some(VersionWrite::Replace(version)) => {
                match stored.versions.iter_mut().find(|v| v.id == version.id) {
                    Some(existing) => *existing = version,
                    None => stored.versions.push(version),
                }
            }
            None => {}
        }

        let next = &change.record;
        let record = &mut stored.record;
        record.document_path = next.document_path.clone();
        record.size_in_bytes = next.size_in_bytes;
        record.state = next.state;
        record.current_version_id = next.current_version_id;
        record.is_deleted = next.is_deleted;
        record.updated_at = Utc::now();
        record.lock_version += 1;

        Ok(record.clone())
    }
}
