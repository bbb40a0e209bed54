use bytes::Bytes;
use chrono::Utc;
use docvault_core::content_disposition;
use docvault_core::validation::{
    ensure_safe_input, mime_type_for_extension, normalize_extension,
    validate_file_and_document_name, MAX_DOCUMENT_NAME_LENGTH,
};
use docvault_core::{
    AppError, Config, DocumentRecord, DocumentState, DocumentVersion, IdentityContext,
    NewDocument, PresignedUpload, StorageVendor, VendorSelector,
};
use docvault_db::{DocumentChange, DocumentRepository, VersionWrite};
use docvault_storage::{keys, ByteStream, Storage, StorageRegistry};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::fingerprint::{fingerprints_match, sha256_hex, sha256_stream};
use super::locks::RecordLocks;
use super::storage_errors::{map_storage_error, Access};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Tunables for [`DocumentService`].
#[derive(Debug, Clone)]
pub struct DocumentServiceSettings {
    /// Lifetime of presigned upload and download URLs.
    pub presign_expiry: Duration,
    /// How many times a commit that lost a lock-version race is re-read and retried.
    pub commit_retries: u32,
}

impl Default for DocumentServiceSettings {
    fn default() -> Self {
        Self {
            presign_expiry: Duration::from_secs(900),
            commit_retries: 3,
        }
    }
}

impl DocumentServiceSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            presign_expiry: config.storage.presign_expiry(),
            commit_retries: config.version_commit_retries,
        }
    }
}

/// Everything needed to serve one version of a document.
#[derive(Debug, Clone)]
pub struct DownloadTarget {
    pub record: DocumentRecord,
    pub version: DocumentVersion,
    pub content_type: &'static str,
    pub content_disposition: String,
}

impl DownloadTarget {
    pub fn path(&self) -> &str {
        &self.version.document_path
    }

    pub fn vendor(&self) -> StorageVendor {
        self.record.storage_vendor
    }
}

pub struct DocumentDownload {
    pub target: DownloadTarget,
    pub stream: ByteStream,
}

/// Orchestrates validation, vendor I/O and record-store commits.
///
/// Mutations of a single record are serialized with an in-process lock and
/// committed with a lock-version compare-and-swap. Bytes are written before the
/// commit, so a failed write leaves metadata untouched.
#[derive(Clone)]
pub struct DocumentService {
    repository: Arc<dyn DocumentRepository>,
    storage: Arc<StorageRegistry>,
    vendor_selector: Arc<dyn VendorSelector>,
    locks: RecordLocks,
    settings: DocumentServiceSettings,
}

impl DocumentService {
    pub fn new(
        repository: Arc<dyn DocumentRepository>,
        storage: Arc<StorageRegistry>,
        vendor_selector: Arc<dyn VendorSelector>,
        settings: DocumentServiceSettings,
    ) -> Self {
        Self {
            repository,
            storage,
            vendor_selector,
            locks: RecordLocks::new(),
            settings,
        }
    }

    pub fn storage(&self) -> &StorageRegistry {
        &self.storage
    }

    /// Validate metadata and persist a record with no content yet.
    ///
    /// The vendor active at this moment is stamped onto the record and never
    /// changes afterwards.
    #[tracing::instrument(
        skip(self, new),
        fields(org_id = %identity.org_id, operation = "create_placeholder")
    )]
    pub async fn create_placeholder(
        &self,
        identity: &IdentityContext,
        new: NewDocument,
    ) -> Result<DocumentRecord, AppError> {
        ensure_safe_input("document_name", &new.document_name)?;
        ensure_safe_input("extension", &new.extension)?;
        if let Some(alternate) = &new.alternate_document_name {
            ensure_safe_input("alternate_document_name", alternate)?;
            if alternate.chars().count() > MAX_DOCUMENT_NAME_LENGTH {
                return Err(AppError::InvalidDocumentName(format!(
                    "Alternate document name must be at most {} characters",
                    MAX_DOCUMENT_NAME_LENGTH
                )));
            }
        }

        let extension = normalize_extension(&new.extension);
        let document_name = new.document_name.trim().to_string();
        validate_file_and_document_name(&extension, &document_name, &document_name)?;

        if new.size_in_bytes < 0 {
            return Err(AppError::BadRequest(
                "size_in_bytes must not be negative".to_string(),
            ));
        }

        if let Some(path) = &new.document_path {
            validate_caller_path(identity.org_id, path)?;
        }

        let vendor = self.vendor_selector.active_vendor();
        let now = Utc::now();
        let record = DocumentRecord {
            id: Uuid::new_v4(),
            org_id: identity.org_id,
            document_name,
            alternate_document_name: new.alternate_document_name,
            extension,
            size_in_bytes: new.size_in_bytes,
            document_path: new.document_path,
            storage_vendor: vendor,
            is_versioned_file: new.is_versioned_file,
            permissions: new.permissions.unwrap_or_else(|| json!({})),
            custom_metadata: new.custom_metadata.unwrap_or_else(|| json!({})),
            initiator_user_id: identity.user_id,
            state: DocumentState::Placeholder,
            current_version_id: None,
            lock_version: 0,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };

        let record = self.repository.insert(&record).await?;

        tracing::info!(
            document_id = %record.id,
            vendor = %record.storage_vendor,
            versioned = record.is_versioned_file,
            "Document placeholder created"
        );

        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(org_id = %identity.org_id))]
    pub async fn get_document(
        &self,
        identity: &IdentityContext,
        id: Uuid,
    ) -> Result<DocumentRecord, AppError> {
        self.load(identity, id).await
    }

    /// Versions of a live document, oldest first.
    #[tracing::instrument(skip(self), fields(org_id = %identity.org_id))]
    pub async fn list_versions(
        &self,
        identity: &IdentityContext,
        id: Uuid,
    ) -> Result<Vec<DocumentVersion>, AppError> {
        self.load(identity, id).await?;
        self.repository.list_versions(identity.org_id, id).await
    }

    /// Store `data` as the document's content.
    ///
    /// Un-versioned documents are overwritten in place; versioned documents get
    /// a new version, exactly like [`Self::upload_next_version`].
    #[tracing::instrument(
        skip(self, data),
        fields(org_id = %identity.org_id, size_bytes = data.len(), operation = "upload_buffered")
    )]
    pub async fn upload_buffered(
        &self,
        identity: &IdentityContext,
        id: Uuid,
        data: Bytes,
    ) -> Result<DocumentRecord, AppError> {
        let _guard = self.locks.acquire(id).await;
        let record = self.load(identity, id).await?;

        if record.is_versioned_file {
            let (record, _) = self.append_version(identity, record, data).await?;
            return Ok(record);
        }
        self.replace_content(identity, record, data).await
    }

    /// Append a new version and make it current.
    #[tracing::instrument(
        skip(self, data),
        fields(org_id = %identity.org_id, size_bytes = data.len(), operation = "upload_next_version")
    )]
    pub async fn upload_next_version(
        &self,
        identity: &IdentityContext,
        id: Uuid,
        data: Bytes,
    ) -> Result<DocumentVersion, AppError> {
        let _guard = self.locks.acquire(id).await;
        let record = self.load(identity, id).await?;

        if !record.is_versioned_file {
            return Err(AppError::NotVersioned(format!(
                "Document {} does not support versioning",
                id
            )));
        }

        let (_, version) = self.append_version(identity, record, data).await?;
        Ok(version)
    }

    /// Presigned PUT URL for the document's pre-assigned path.
    #[tracing::instrument(
        skip(self),
        fields(org_id = %identity.org_id, operation = "generate_direct_upload_url")
    )]
    pub async fn generate_direct_upload_url(
        &self,
        identity: &IdentityContext,
        id: Uuid,
    ) -> Result<PresignedUpload, AppError> {
        let record = self.load(identity, id).await?;
        let path = direct_upload_path(&record)?;

        if !record.storage_vendor.supports_presign() {
            return Err(AppError::UnsupportedOperation(format!(
                "Direct uploads are not supported by the {} vendor",
                record.storage_vendor
            )));
        }
        if record.is_versioned_file && record.has_content() {
            return Err(AppError::BadRequest(
                "Versioned documents with content accept new versions through upload".to_string(),
            ));
        }

        let adapter = self.adapter(record.storage_vendor)?;
        let expiry = self.settings.presign_expiry;
        let url = adapter
            .generate_presigned_upload_url(path, expiry)
            .await
            .map_err(|e| map_storage_error(record.storage_vendor, path, Access::Write, e))?;

        tracing::info!(
            document_id = %id,
            vendor = %record.storage_vendor,
            expires_in_secs = expiry.as_secs(),
            "Direct upload URL issued"
        );

        Ok(PresignedUpload {
            url,
            method: "PUT".to_string(),
            document_path: path.to_string(),
            expires_at: Utc::now() + chrono::Duration::seconds(expiry.as_secs() as i64),
        })
    }

    /// Record the object a client uploaded through a presigned URL.
    #[tracing::instrument(
        skip(self),
        fields(org_id = %identity.org_id, operation = "complete_direct_upload")
    )]
    pub async fn complete_direct_upload(
        &self,
        identity: &IdentityContext,
        id: Uuid,
    ) -> Result<DocumentRecord, AppError> {
        let _guard = self.locks.acquire(id).await;
        let record = self.load(identity, id).await?;
        let path = direct_upload_path(&record)?.to_string();
        let vendor = record.storage_vendor;

        let adapter = self.adapter(vendor)?;
        let info = adapter
            .head_object(&path)
            .await
            .map_err(|e| map_storage_error(vendor, &path, Access::Read, e))?;
        let size = to_db_size(info.size_in_bytes)?;

        let mut attempt = 0;
        loop {
            let current = self.load(identity, id).await?;
            let write = if current.is_versioned_file {
                if current.has_content() {
                    return Err(AppError::BadRequest(
                        "Versioned documents with content accept new versions through upload"
                            .to_string(),
                    ));
                }
                VersionWrite::Append(DocumentVersion::new(
                    id,
                    1,
                    path.clone(),
                    size,
                    None,
                    identity.user_id,
                ))
            } else {
                VersionWrite::Replace(replacement_version(&current, path.clone(), size, None, identity))
            };

            let change = content_change(current, write);
            match self.repository.commit(change).await {
                Err(e) if self.should_retry(&e, &mut attempt) => continue,
                result => {
                    let record = result?;
                    tracing::info!(document_id = %id, size_bytes = size, "Direct upload completed");
                    return Ok(record);
                }
            }
        }
    }

    /// Move the current pointer to the highest version below it.
    ///
    /// Nothing is deleted: the superseded version stays listed and the next
    /// upload takes the next unused ordinal.
    #[tracing::instrument(
        skip(self),
        fields(org_id = %identity.org_id, operation = "roll_back_to_previous_version")
    )]
    pub async fn roll_back_to_previous_version(
        &self,
        identity: &IdentityContext,
        id: Uuid,
    ) -> Result<DocumentRecord, AppError> {
        let _guard = self.locks.acquire(id).await;

        let mut attempt = 0;
        loop {
            let mut record = self.load(identity, id).await?;
            if !record.is_versioned_file {
                return Err(AppError::NotVersioned(format!(
                    "Document {} does not support versioning",
                    id
                )));
            }

            let versions = self.repository.list_versions(identity.org_id, id).await?;
            let no_previous = || {
                AppError::NoPreviousVersion(format!("Document {} has no previous version", id))
            };
            if versions.len() < 2 {
                return Err(no_previous());
            }

            let current_number = record
                .current_version_id
                .and_then(|cur| versions.iter().find(|v| v.id == cur))
                .map(|v| v.version_number)
                .ok_or_else(no_previous)?;
            let previous = versions
                .iter()
                .filter(|v| v.version_number < current_number)
                .max_by_key(|v| v.version_number)
                .ok_or_else(no_previous)?;

            record.current_version_id = Some(previous.id);
            record.document_path = Some(previous.document_path.clone());
            record.size_in_bytes = previous.size_in_bytes;
            record.state = DocumentState::RolledBack;
            let target_number = previous.version_number;

            match self.repository.commit(DocumentChange::from_loaded(record)).await {
                Err(e) if self.should_retry(&e, &mut attempt) => continue,
                result => {
                    let record = result?;
                    tracing::info!(
                        document_id = %id,
                        from_version = current_number,
                        to_version = target_number,
                        "Document rolled back"
                    );
                    return Ok(record);
                }
            }
        }
    }

    /// Whether the current content differs from `comparison_hash` (SHA-256 hex).
    ///
    /// Uses the stored fingerprint when there is one and hashes the stored
    /// object otherwise. A document without content always counts as modified.
    #[tracing::instrument(skip(self, comparison_hash), fields(org_id = %identity.org_id))]
    pub async fn is_modified(
        &self,
        identity: &IdentityContext,
        id: Uuid,
        comparison_hash: &str,
    ) -> Result<bool, AppError> {
        let record = self.load(identity, id).await?;
        if !record.has_content() {
            return Ok(true);
        }

        let target = self.target_for(record, None).await?;
        let current_hash = match &target.version.content_hash {
            Some(hash) => hash.clone(),
            None => {
                let vendor = target.vendor();
                let stream = self.open_stream(&target).await?;
                sha256_stream(stream)
                    .await
                    .map_err(|e| map_storage_error(vendor, target.path(), Access::Read, e))?
            }
        };

        Ok(!fingerprints_match(&current_hash, comparison_hash))
    }

    /// Soft delete. Bytes and versions are kept; deleting twice is not an error.
    #[tracing::instrument(skip(self), fields(org_id = %identity.org_id, operation = "delete_document"))]
    pub async fn delete_document(
        &self,
        identity: &IdentityContext,
        id: Uuid,
    ) -> Result<(), AppError> {
        let _guard = self.locks.acquire(id).await;

        let mut attempt = 0;
        loop {
            let mut record = self
                .repository
                .get_including_deleted(identity.org_id, id)
                .await?
                .ok_or_else(|| AppError::document_not_found(id))?;
            if record.is_deleted {
                return Ok(());
            }

            record.is_deleted = true;
            record.state = DocumentState::Deleted;

            match self.repository.commit(DocumentChange::from_loaded(record)).await {
                Ok(_) => {
                    tracing::info!(document_id = %id, "Document soft-deleted");
                    return Ok(());
                }
                // Another process deleted it between our read and commit.
                Err(AppError::NotFound(_)) if attempt < self.settings.commit_retries => {
                    attempt += 1;
                }
                Err(e) if self.should_retry(&e, &mut attempt) => {}
                Err(e) => return Err(e),
            }
        }
    }

    /// Resolve the record, version, headers and locator for a download.
    #[tracing::instrument(skip(self), fields(org_id = %identity.org_id))]
    pub async fn resolve_download(
        &self,
        identity: &IdentityContext,
        id: Uuid,
        version_id: Option<Uuid>,
    ) -> Result<DownloadTarget, AppError> {
        let record = self.load(identity, id).await?;
        self.target_for(record, version_id).await
    }

    /// Open a byte stream for the current (or a specific) version.
    #[tracing::instrument(skip(self), fields(org_id = %identity.org_id, operation = "download"))]
    pub async fn download(
        &self,
        identity: &IdentityContext,
        id: Uuid,
        version_id: Option<Uuid>,
    ) -> Result<DocumentDownload, AppError> {
        let target = self.resolve_download(identity, id, version_id).await?;
        let stream = self.open_stream(&target).await?;
        Ok(DocumentDownload { target, stream })
    }

    /// Presigned GET URL for remote vendors.
    #[tracing::instrument(skip(self), fields(org_id = %identity.org_id))]
    pub async fn generate_download_url(
        &self,
        identity: &IdentityContext,
        id: Uuid,
        version_id: Option<Uuid>,
    ) -> Result<String, AppError> {
        let target = self.resolve_download(identity, id, version_id).await?;
        let vendor = target.vendor();
        let adapter = self.adapter(vendor)?;
        adapter
            .generate_presigned_download_url(target.path(), self.settings.presign_expiry)
            .await
            .map_err(|e| map_storage_error(vendor, target.path(), Access::Read, e))
    }

    async fn load(&self, identity: &IdentityContext, id: Uuid) -> Result<DocumentRecord, AppError> {
        self.repository
            .get(identity.org_id, id)
            .await?
            .ok_or_else(|| AppError::document_not_found(id))
    }

    fn adapter(&self, vendor: StorageVendor) -> Result<Arc<dyn Storage>, AppError> {
        self.storage
            .get(vendor)
            .map_err(|e| AppError::Internal(e.to_string()))
    }

    fn should_retry(&self, err: &AppError, attempt: &mut u32) -> bool {
        if matches!(err, AppError::Conflict(_)) && *attempt < self.settings.commit_retries {
            *attempt += 1;
            tracing::debug!(attempt = *attempt, "Commit lost a concurrent update, retrying");
            true
        } else {
            false
        }
    }

    /// Open the byte stream behind an already resolved target.
    pub async fn open_stream(&self, target: &DownloadTarget) -> Result<ByteStream, AppError> {
        let vendor = target.vendor();
        self.adapter(vendor)?
            .get_object(target.path())
            .await
            .map_err(|e| map_storage_error(vendor, target.path(), Access::Read, e))
    }

    async fn target_for(
        &self,
        record: DocumentRecord,
        version_id: Option<Uuid>,
    ) -> Result<DownloadTarget, AppError> {
        let wanted = match version_id.or(record.current_version_id) {
            Some(wanted) => wanted,
            None => {
                return Err(AppError::NotFound(format!(
                    "Document {} has no content",
                    record.id
                )))
            }
        };

        let version = self
            .repository
            .list_versions(record.org_id, record.id)
            .await?
            .into_iter()
            .find(|v| v.id == wanted)
            .ok_or_else(|| AppError::NotFound(format!("Version {} not found", wanted)))?;

        let content_type =
            mime_type_for_extension(&record.extension).unwrap_or(FALLBACK_CONTENT_TYPE);
        let content_disposition = content_disposition::attachment(&record.file_name());

        Ok(DownloadTarget {
            record,
            version,
            content_type,
            content_disposition,
        })
    }

    /// Overwrite the single object of an un-versioned document.
    async fn replace_content(
        &self,
        identity: &IdentityContext,
        record: DocumentRecord,
        data: Bytes,
    ) -> Result<DocumentRecord, AppError> {
        let vendor = record.storage_vendor;
        let path = record
            .document_path
            .clone()
            .unwrap_or_else(|| keys::document_key(record.org_id, record.id, &record.extension));
        let hash = sha256_hex(&data);

        let put = self
            .adapter(vendor)?
            .put_object(&path, data)
            .await
            .map_err(|e| map_storage_error(vendor, &path, Access::Write, e))?;
        let size = to_db_size(put.size_in_bytes)?;

        let mut attempt = 0;
        loop {
            let current = self.load(identity, record.id).await?;
            let version = replacement_version(
                &current,
                put.vendor_path.clone(),
                size,
                Some(hash.clone()),
                identity,
            );
            let change = content_change(current, VersionWrite::Replace(version));

            match self.repository.commit(change).await {
                Err(e) if self.should_retry(&e, &mut attempt) => continue,
                result => {
                    let record = result?;
                    tracing::info!(
                        document_id = %record.id,
                        vendor = %vendor,
                        size_bytes = size,
                        "Document content uploaded"
                    );
                    return Ok(record);
                }
            }
        }
    }

    /// Write a new version object and commit it with the next unused ordinal.
    ///
    /// The object key is unique per version, so the write happens once; only the
    /// commit is retried. If the commit fails for good the object is removed.
    async fn append_version(
        &self,
        identity: &IdentityContext,
        record: DocumentRecord,
        data: Bytes,
    ) -> Result<(DocumentRecord, DocumentVersion), AppError> {
        let vendor = record.storage_vendor;
        let version_id = Uuid::new_v4();
        let key = keys::version_key(record.org_id, record.id, version_id, &record.extension);
        let hash = sha256_hex(&data);

        let adapter = self.adapter(vendor)?;
        let put = adapter
            .put_object(&key, data)
            .await
            .map_err(|e| map_storage_error(vendor, &key, Access::Write, e))?;
        let size = to_db_size(put.size_in_bytes)?;

        match self
            .commit_version(identity, record.id, version_id, &put.vendor_path, size, &hash)
            .await
        {
            Ok(committed) => Ok(committed),
            Err(e) => {
                if let Err(cleanup) = adapter.delete_object(&put.vendor_path).await {
                    tracing::warn!(
                        error = %cleanup,
                        document_id = %record.id,
                        vendor = %vendor,
                        "Failed to remove orphaned version object"
                    );
                }
                Err(e)
            }
        }
    }

    async fn commit_version(
        &self,
        identity: &IdentityContext,
        id: Uuid,
        version_id: Uuid,
        vendor_path: &str,
        size: i64,
        hash: &str,
    ) -> Result<(DocumentRecord, DocumentVersion), AppError> {
        let mut attempt = 0;
        loop {
            let current = self.load(identity, id).await?;
            let existing = self.repository.list_versions(identity.org_id, id).await?;
            let next_number = existing
                .iter()
                .map(|v| v.version_number)
                .max()
                .unwrap_or(0)
                + 1;

            let version = DocumentVersion {
                id: version_id,
                document_id: id,
                version_number: next_number,
                document_path: vendor_path.to_string(),
                size_in_bytes: size,
                content_hash: Some(hash.to_string()),
                created_by: identity.user_id,
                created_at: Utc::now(),
            };

            let mut change = content_change(current, VersionWrite::Append(version.clone()));
            change.record.state = if existing.is_empty() {
                DocumentState::Uploaded
            } else {
                DocumentState::Versioned
            };

            match self.repository.commit(change).await {
                Err(e) if self.should_retry(&e, &mut attempt) => continue,
                result => {
                    let record = result?;
                    tracing::info!(
                        document_id = %id,
                        version_number = next_number,
                        size_bytes = size,
                        "Document version committed"
                    );
                    return Ok((record, version));
                }
            }
        }
    }
}

/// Record change that points `current` at the version being written.
fn content_change(current: DocumentRecord, write: VersionWrite) -> DocumentChange {
    let version = write.version();
    let mut record = current;
    record.document_path = Some(version.document_path.clone());
    record.size_in_bytes = version.size_in_bytes;
    record.current_version_id = Some(version.id);
    record.state = DocumentState::Uploaded;
    DocumentChange::from_loaded(record).with_version(write)
}

/// The single version of an un-versioned document, reusing its id if it has one.
fn replacement_version(
    current: &DocumentRecord,
    path: String,
    size: i64,
    hash: Option<String>,
    identity: &IdentityContext,
) -> DocumentVersion {
    let mut version = DocumentVersion::new(current.id, 1, path, size, hash, identity.user_id);
    if let Some(existing) = current.current_version_id {
        version.id = existing;
    }
    version
}

fn direct_upload_path(record: &DocumentRecord) -> Result<&str, AppError> {
    match record.document_path.as_deref() {
        Some(path) if !path.is_empty() => Ok(path),
        _ => Err(AppError::BadRequest(format!(
            "Document {} has no storage path for a direct upload",
            record.id
        ))),
    }
}

/// Caller-assigned paths must be well-formed keys inside the caller's org prefix.
fn validate_caller_path(org_id: Uuid, path: &str) -> Result<(), AppError> {
    keys::validate_key(path).map_err(|e| AppError::InvalidPath(e.to_string()))?;
    if !path.starts_with(&keys::org_prefix(org_id)) {
        return Err(AppError::InvalidPath(
            "Document path must be inside the organization's key prefix".to_string(),
        ));
    }
    Ok(())
}

fn to_db_size(size: u64) -> Result<i64, AppError> {
    i64::try_from(size).map_err(|_| AppError::PayloadTooLarge(format!("{} bytes", size)))
}
