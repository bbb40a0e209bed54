use docvault_core::{AppError, StorageVendor};
use docvault_storage::StorageError;

/// Which side of the adapter a failure happened on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Access {
    Read,
    Write,
}

/// Translate an adapter failure into the service error taxonomy, keeping vendor
/// and path for diagnostics.
pub(crate) fn map_storage_error(
    vendor: StorageVendor,
    path: &str,
    access: Access,
    err: StorageError,
) -> AppError {
    let path = path.to_string();
    match err {
        StorageError::NotFound(_) => {
            AppError::NotFound("Document content not found in storage".to_string())
        }
        StorageError::InvalidPath(message) | StorageError::InvalidKey(message) => {
            AppError::InvalidPath(message)
        }
        StorageError::Unsupported(message) => AppError::UnsupportedOperation(message),
        StorageError::PresignFailed { status, message } => AppError::Presign {
            vendor,
            path,
            status,
            message,
        },
        StorageError::UploadFailed(message) | StorageError::DeleteFailed(message) => {
            AppError::StorageWrite {
                vendor,
                path,
                message,
            }
        }
        StorageError::DownloadFailed(message) => AppError::StorageRead {
            vendor,
            path,
            message,
        },
        StorageError::BackendError(message) => by_access(vendor, path, access, message),
        StorageError::IoError(e) => by_access(vendor, path, access, e.to_string()),
        StorageError::ConfigError(message) => AppError::Internal(message),
    }
}

fn by_access(vendor: StorageVendor, path: String, access: Access, message: String) -> AppError {
    match access {
        Access::Read => AppError::StorageRead {
            vendor,
            path,
            message,
        },
        Access::Write => AppError::StorageWrite {
            vendor,
            path,
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy() {
        let vendor = StorageVendor::ObjectStorage;
        assert!(matches!(
            map_storage_error(vendor, "k", Access::Read, StorageError::NotFound("k".into())),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            map_storage_error(vendor, "k", Access::Read, StorageError::InvalidKey("bad".into())),
            AppError::InvalidPath(_)
        ));
        assert!(matches!(
            map_storage_error(
                StorageVendor::Local,
                "k",
                Access::Write,
                StorageError::Unsupported("no".into())
            ),
            AppError::UnsupportedOperation(_)
        ));
        assert!(matches!(
            map_storage_error(
                vendor,
                "k",
                Access::Write,
                StorageError::UploadFailed("quota".into())
            ),
            AppError::StorageWrite { .. }
        ));
    }

    #[test]
    fn test_presign_failure_keeps_status() {
        let err = map_storage_error(
            StorageVendor::BlobStorage,
            "documents/o/d.pdf",
            Access::Write,
            StorageError::PresignFailed {
                status: Some(403),
                message: "denied".into(),
            },
        );
        match err {
            AppError::Presign {
                vendor,
                path,
                status,
                ..
            } => {
                assert_eq!(vendor, StorageVendor::BlobStorage);
                assert_eq!(path, "documents/o/d.pdf");
                assert_eq!(status, Some(403));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_backend_error_follows_access() {
        let vendor = StorageVendor::Local;
        assert!(matches!(
            map_storage_error(vendor, "k", Access::Read, StorageError::BackendError("x".into())),
            AppError::StorageRead { .. }
        ));
        assert!(matches!(
            map_storage_error(vendor, "k", Access::Write, StorageError::BackendError("x".into())),
            AppError::StorageWrite { .. }
        ));
    }
}
