//! Shared fixtures for document service tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use docvault_core::{
    AppError, DocumentRecord, DocumentVersion, IdentityContext, NewDocument, StaticVendorSelector,
    StorageVendor, VendorSelector,
};
use docvault_db::{DocumentChange, DocumentRepository, InMemoryDocumentRepository};
use docvault_services::{
    ByteStream, DocumentService, DocumentServiceSettings, LocalStorage, Storage, StorageError,
    StorageRegistry, StorageResult,
};
use docvault_storage::{ObjectInfo, PutResult};
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Remote-style adapter keeping objects in memory and minting fake signed URLs.
#[derive(Clone, Default)]
pub struct MemoryObjectStorage {
    objects: Arc<Mutex<HashMap<String, Bytes>>>,
}

impl MemoryObjectStorage {
    pub async fn insert(&self, key: &str, data: &'static [u8]) {
        self.objects
            .lock()
            .await
            .insert(key.to_string(), Bytes::from_static(data));
    }

    pub async fn keys(&self) -> Vec<String> {
        self.objects.lock().await.keys().cloned().collect()
    }
}

#[async_trait]
impl Storage for MemoryObjectStorage {
    fn vendor(&self) -> StorageVendor {
        StorageVendor::ObjectStorage
    }

    async fn put_object(&self, path: &str, data: Bytes) -> StorageResult<PutResult> {
        let size_in_bytes = data.len() as u64;
        self.objects.lock().await.insert(path.to_string(), data);
        Ok(PutResult {
            vendor_path: path.to_string(),
            size_in_bytes,
        })
    }

    async fn generate_presigned_upload_url(
        &self,
        path: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        Ok(format!(
            "https://objects.test/{}?op=put&expires={}",
            path,
            expires_in.as_secs()
        ))
    }

    async fn generate_presigned_download_url(
        &self,
        path: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        Ok(format!(
            "https://objects.test/{}?op=get&expires={}",
            path,
            expires_in.as_secs()
        ))
    }

    async fn get_object(&self, path: &str) -> StorageResult<ByteStream> {
        let data = self
            .objects
            .lock()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))?;
        Ok(Box::pin(futures::stream::once(async move { Ok(data) })))
    }

    async fn head_object(&self, path: &str) -> StorageResult<ObjectInfo> {
        self.objects
            .lock()
            .await
            .get(path)
            .map(|data| ObjectInfo {
                size_in_bytes: data.len() as u64,
            })
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn delete_object(&self, path: &str) -> StorageResult<()> {
        self.objects.lock().await.remove(path);
        Ok(())
    }
}

/// Adapter whose every call fails like an unreachable backend.
pub struct FailingStorage(pub StorageVendor);

#[async_trait]
impl Storage for FailingStorage {
    fn vendor(&self) -> StorageVendor {
        self.0
    }

    async fn put_object(&self, _path: &str, _data: Bytes) -> StorageResult<PutResult> {
        Err(StorageError::UploadFailed("connection reset".to_string()))
    }

    async fn generate_presigned_upload_url(
        &self,
        _path: &str,
        _expires_in: Duration,
    ) -> StorageResult<String> {
        Err(StorageError::PresignFailed {
            status: Some(403),
            message: "AccessDenied".to_string(),
        })
    }

    async fn generate_presigned_download_url(
        &self,
        _path: &str,
        _expires_in: Duration,
    ) -> StorageResult<String> {
        Err(StorageError::PresignFailed {
            status: Some(403),
            message: "AccessDenied".to_string(),
        })
    }

    async fn get_object(&self, path: &str) -> StorageResult<ByteStream> {
        Err(StorageError::DownloadFailed(format!("cannot read {}", path)))
    }

    async fn head_object(&self, path: &str) -> StorageResult<ObjectInfo> {
        Err(StorageError::BackendError(format!("cannot stat {}", path)))
    }

    async fn delete_object(&self, _path: &str) -> StorageResult<()> {
        Err(StorageError::DeleteFailed("connection reset".to_string()))
    }
}

/// Repository whose commits always lose the lock-version race.
pub struct ConflictingRepository(pub InMemoryDocumentRepository);

#[async_trait]
impl DocumentRepository for ConflictingRepository {
    async fn insert(&self, record: &DocumentRecord) -> Result<DocumentRecord, AppError> {
        self.0.insert(record).await
    }

    async fn get(&self, org_id: Uuid, id: Uuid) -> Result<Option<DocumentRecord>, AppError> {
        self.0.get(org_id, id).await
    }

    async fn get_including_deleted(
        &self,
        org_id: Uuid,
        id: Uuid,
    ) -> Result<Option<DocumentRecord>, AppError> {
        self.0.get_including_deleted(org_id, id).await
    }

    async fn list_versions(
        &self,
        org_id: Uuid,
        document_id: Uuid,
    ) -> Result<Vec<DocumentVersion>, AppError> {
        self.0.list_versions(org_id, document_id).await
    }

    async fn commit(&self, change: DocumentChange) -> Result<DocumentRecord, AppError> {
        Err(AppError::Conflict(format!(
            "Document {} was modified concurrently",
            change.record.id
        )))
    }
}

pub struct TestContext {
    pub service: DocumentService,
    pub repository: Arc<InMemoryDocumentRepository>,
    pub local: Arc<LocalStorage>,
    pub objects: MemoryObjectStorage,
    pub identity: IdentityContext,
    _dir: TempDir,
}

pub async fn local_context() -> TestContext {
    context_with(Arc::new(StaticVendorSelector(StorageVendor::Local))).await
}

pub async fn object_context() -> TestContext {
    context_with(Arc::new(StaticVendorSelector(StorageVendor::ObjectStorage))).await
}

pub async fn context_with(selector: Arc<dyn VendorSelector>) -> TestContext {
    let dir = tempfile::tempdir().expect("tempdir");
    let local = Arc::new(LocalStorage::new(dir.path()).await.expect("local storage"));
    let objects = MemoryObjectStorage::default();

    let mut registry = StorageRegistry::new();
    registry.register_local(local.clone());
    registry.register(Arc::new(objects.clone()));

    let repository = Arc::new(InMemoryDocumentRepository::new());
    let service = DocumentService::new(
        repository.clone(),
        Arc::new(registry),
        selector,
        DocumentServiceSettings::default(),
    );

    TestContext {
        service,
        repository,
        local,
        objects,
        identity: IdentityContext::new(Uuid::new_v4(), Some(Uuid::new_v4())),
        _dir: dir,
    }
}

/// Service over a single adapter and an arbitrary repository.
pub fn service_with(
    repository: Arc<dyn DocumentRepository>,
    adapter: Arc<dyn Storage>,
) -> DocumentService {
    let vendor = adapter.vendor();
    let mut registry = StorageRegistry::new();
    registry.register(adapter);
    DocumentService::new(
        repository,
        Arc::new(registry),
        Arc::new(StaticVendorSelector(vendor)),
        DocumentServiceSettings::default(),
    )
}

pub fn new_document(name: &str, extension: &str, versioned: bool) -> NewDocument {
    NewDocument {
        document_name: name.to_string(),
        extension: extension.to_string(),
        is_versioned_file: versioned,
        ..Default::default()
    }
}

pub async fn collect(mut stream: ByteStream) -> Vec<u8> {
    let mut out = Vec::new();
    while let Some(chunk) = stream.next().await {
        out.extend_from_slice(&chunk.expect("chunk"));
    }
    out
}

/// Regular files below `dir`, recursively.
pub fn files_under(dir: &std::path::Path) -> Vec<std::path::PathBuf> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let Ok(entries) = std::fs::read_dir(&current) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else {
                files.push(path);
            }
        }
    }
    files
}
