use crate::keys;
use crate::traits::{ByteStream, ObjectInfo, PutResult, Storage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use docvault_core::StorageVendor;
use futures::StreamExt;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

const FILE_URI_SCHEME: &str = "file://";

/// Local filesystem storage implementation
///
/// Objects are addressed by key on write and recorded as `file://` URIs. Every
/// locator, key or URI, is resolved against the canonical storage root and
/// rejected with [`StorageError::InvalidPath`] if it would land outside it.
#[derive(Clone, Debug)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at `root`, creating the directory if needed.
    pub async fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();

        fs::create_dir_all(&root).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                root.display(),
                e
            ))
        })?;

        let root = fs::canonicalize(&root).await.map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize storage root: {}", e))
        })?;

        Ok(LocalStorage { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `file://` URI for an absolute path, percent-encoding each segment.
    pub fn path_to_uri(&self, path: &Path) -> String {
        let mut uri = String::from(FILE_URI_SCHEME);
        for component in path.components() {
            match component {
                Component::Prefix(prefix) => {
                    uri.push('/');
                    uri.push_str(&prefix.as_os_str().to_string_lossy());
                }
                Component::RootDir => {}
                Component::Normal(segment) => {
                    uri.push('/');
                    uri.push_str(&urlencoding::encode(&segment.to_string_lossy()));
                }
                Component::CurDir | Component::ParentDir => {}
            }
        }
        uri
    }

    /// Resolve a key or `file://` URI to a path inside the storage root.
    ///
    /// Purely lexical: nothing on disk is touched, so a rejected locator never
    /// reaches a filesystem call.
    pub fn resolve(&self, locator: &str) -> StorageResult<PathBuf> {
        let candidate = match locator.strip_prefix(FILE_URI_SCHEME) {
            Some(rest) => decode_file_uri(rest)?,
            None => {
                keys::validate_key(locator)
                    .map_err(|e| StorageError::InvalidPath(e.to_string()))?;
                self.root.join(locator)
            }
        };

        if candidate
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::CurDir))
        {
            return Err(StorageError::InvalidPath(
                "Path contains relative segments".to_string(),
            ));
        }

        if candidate == self.root || !candidate.starts_with(&self.root) {
            return Err(StorageError::InvalidPath(
                "Path resolves outside storage directory".to_string(),
            ));
        }

        Ok(candidate)
    }

    /// Follow symlinks on the deepest existing ancestor and make sure it still
    /// lives under the root.
    async fn ensure_within_root(&self, path: &Path) -> StorageResult<()> {
        let mut current = Some(path);
        while let Some(p) = current {
            match fs::canonicalize(p).await {
                Ok(canonical) => {
                    if canonical.starts_with(&self.root) {
                        return Ok(());
                    }
                    return Err(StorageError::InvalidPath(
                        "Path resolves outside storage directory".to_string(),
                    ));
                }
                Err(_) => current = p.parent(),
            }
        }
        Ok(())
    }

    /// Open the file behind `locator` for reading, returning it with its length.
    pub async fn open(&self, locator: &str) -> StorageResult<(fs::File, u64)> {
        let path = self.resolve(locator)?;
        self.ensure_within_root(&path).await?;

        let file = fs::File::open(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(locator.to_string()),
            _ => StorageError::DownloadFailed(format!(
                "Failed to open file {}: {}",
                path.display(),
                e
            )),
        })?;

        let meta = file
            .metadata()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;
        if !meta.is_file() {
            return Err(StorageError::NotFound(locator.to_string()));
        }

        Ok((file, meta.len()))
    }

    async fn write_atomically(&self, path: &Path, data: &[u8]) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp_path = path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));

        let result = async {
            let mut file = fs::File::create(&tmp_path).await.map_err(|e| {
                StorageError::UploadFailed(format!(
                    "Failed to create file {}: {}",
                    tmp_path.display(),
                    e
                ))
            })?;

            file.write_all(data).await.map_err(|e| {
                StorageError::UploadFailed(format!(
                    "Failed to write file {}: {}",
                    tmp_path.display(),
                    e
                ))
            })?;

            file.sync_all().await.map_err(|e| {
                StorageError::UploadFailed(format!(
                    "Failed to sync file {}: {}",
                    tmp_path.display(),
                    e
                ))
            })?;

            fs::rename(&tmp_path, path).await.map_err(|e| {
                StorageError::UploadFailed(format!(
                    "Failed to move file into place at {}: {}",
                    path.display(),
                    e
                ))
            })
        }
        .await;

        if result.is_err() {
            let _ = fs::remove_file(&tmp_path).await;
        }
        result
    }
}

/// Decode the part of a `file://` URI after the scheme into an absolute path.
fn decode_file_uri(rest: &str) -> StorageResult<PathBuf> {
    let rest = rest.strip_prefix("localhost").unwrap_or(rest);
    let decoded = urlencoding::decode(rest)
        .map_err(|_| StorageError::InvalidPath("URI is not valid UTF-8".to_string()))?;

    if decoded.contains('\0') {
        return Err(StorageError::InvalidPath(
            "URI contains a null byte".to_string(),
        ));
    }

    let trimmed = decoded.trim_start_matches(&['/', '\\'][..]);
    let bytes = trimmed.as_bytes();
    let has_drive = bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':';

    if has_drive {
        Ok(PathBuf::from(trimmed))
    } else {
        Ok(PathBuf::from(format!("/{}", trimmed)))
    }
}

#[async_trait]
impl Storage for LocalStorage {
    fn vendor(&self) -> StorageVendor {
        StorageVendor::Local
    }

    async fn put_object(&self, path: &str, data: Bytes) -> StorageResult<PutResult> {
        let target = self.resolve(path)?;
        self.ensure_within_root(&target).await?;
        let size = data.len() as u64;
        let start = std::time::Instant::now();

        self.write_atomically(&target, &data).await.map_err(|e| {
            tracing::error!(
                error = %e,
                path = %target.display(),
                size_bytes = size,
                "Local storage write failed"
            );
            e
        })?;

        tracing::info!(
            path = %target.display(),
            key = %path,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage write successful"
        );

        Ok(PutResult {
            vendor_path: self.path_to_uri(&target),
            size_in_bytes: size,
        })
    }

    async fn generate_presigned_upload_url(
        &self,
        _path: &str,
        _expires_in: Duration,
    ) -> StorageResult<String> {
        Err(StorageError::Unsupported(
            "Local filesystem storage does not support presigned uploads".to_string(),
        ))
    }

    async fn generate_presigned_download_url(
        &self,
        _path: &str,
        _expires_in: Duration,
    ) -> StorageResult<String> {
        Err(StorageError::Unsupported(
            "Local filesystem storage does not support presigned downloads".to_string(),
        ))
    }

    async fn get_object(&self, path: &str) -> StorageResult<ByteStream> {
        let start = std::time::Instant::now();
        let (file, size) = self.open(path).await?;

        let key = path.to_string();
        let stream = tokio_util::io::ReaderStream::new(file).map(move |result| {
            result.map_err(|e| {
                tracing::error!(
                    error = %e,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Local storage stream read error"
                );
                StorageError::DownloadFailed(format!("Failed to read chunk: {}", e))
            })
        });

        tracing::debug!(key = %path, size_bytes = size, "Local storage stream opened");

        Ok(Box::pin(stream))
    }

    async fn head_object(&self, path: &str) -> StorageResult<ObjectInfo> {
        let target = self.resolve(path)?;
        self.ensure_within_root(&target).await?;

        let meta = fs::metadata(&target).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(path.to_string()),
            _ => StorageError::BackendError(e.to_string()),
        })?;
        if !meta.is_file() {
            return Err(StorageError::NotFound(path.to_string()));
        }

        Ok(ObjectInfo {
            size_in_bytes: meta.len(),
        })
    }

    async fn delete_object(&self, path: &str) -> StorageResult<()> {
        let target = self.resolve(path)?;
        self.ensure_within_root(&target).await?;

        match fs::remove_file(&target).await {
            Ok(()) => {
                tracing::info!(path = %target.display(), "Local storage delete successful");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to delete file {}: {}",
                target.display(),
                e
            ))),
        }
    }
}
