//! Error types module
//!
//! Every failure the document service can surface is a variant of [`AppError`].
//! Adapter and repository errors are wrapped with enough context (vendor, path,
//! backend status) to be diagnosed from logs without retrying.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

use crate::storage_types::StorageVendor;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like conflicts
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
/// This trait allows errors to self-describe their HTTP response characteristics
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "NOT_FOUND")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden from clients
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid document name: {0}")]
    InvalidDocumentName(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Unsafe input rejected: {0}")]
    UnsafeInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Document is not versioned: {0}")]
    NotVersioned(String),

    #[error("No previous version: {0}")]
    NoPreviousVersion(String),

    #[error("Storage write failed on {vendor} at '{path}': {message}")]
    StorageWrite {
        vendor: StorageVendor,
        path: String,
        message: String,
    },

    #[error("Storage read failed on {vendor} at '{path}': {message}")]
    StorageRead {
        vendor: StorageVendor,
        path: String,
        message: String,
    },

    #[error("Presign failed on {vendor} at '{path}' (status {status:?}): {message}")]
    Presign {
        vendor: StorageVendor,
        path: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Invalid storage path: {0}")]
    InvalidPath(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::BadRequest(format!("UUID parsing error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
/// client_message stays per-variant for dynamic content.
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::InvalidDocumentName(_) => (
            400,
            "INVALID_DOCUMENT_NAME",
            false,
            Some("Remove the extension and any path separators from the document name"),
            false,
            LogLevel::Debug,
        ),
        AppError::UnsupportedFileType(_) => (
            415,
            "UNSUPPORTED_FILE_TYPE",
            false,
            Some("Upload a file with a supported extension"),
            false,
            LogLevel::Debug,
        ),
        AppError::UnsafeInput(_) => (
            400,
            "UNSAFE_INPUT",
            false,
            Some("Remove markup and format specifiers from the value"),
            false,
            LogLevel::Warn,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the resource ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::BadRequest(_) => (
            400,
            "BAD_REQUEST",
            false,
            Some("Check request format and parameters"),
            false,
            LogLevel::Debug,
        ),
        AppError::UnsupportedOperation(_) => (
            501,
            "UNSUPPORTED_OPERATION",
            false,
            Some("Upload through the service instead"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotVersioned(_) => (
            409,
            "NOT_VERSIONED",
            false,
            Some("Use a buffered upload to replace the content"),
            false,
            LogLevel::Debug,
        ),
        AppError::NoPreviousVersion(_) => (
            409,
            "NO_PREVIOUS_VERSION",
            false,
            Some("Upload another version before rolling back"),
            false,
            LogLevel::Debug,
        ),
        AppError::StorageWrite { .. } => (
            502,
            "STORAGE_WRITE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::StorageRead { .. } => (
            502,
            "STORAGE_READ_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Presign { .. } => (
            502,
            "PRESIGN_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InvalidPath(_) => (
            400,
            "INVALID_PATH",
            false,
            None,
            false,
            LogLevel::Warn,
        ),
        AppError::Conflict(_) => (
            409,
            "CONFLICT",
            true,
            Some("Reload the document and retry"),
            false,
            LogLevel::Warn,
        ),
        AppError::PayloadTooLarge(_) => (
            413,
            "PAYLOAD_TOO_LARGE",
            false,
            Some("Request a direct upload URL for large files"),
            false,
            LogLevel::Debug,
        ),
        AppError::Database(_) => (
            500,
            "DATABASE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::InvalidDocumentName(_) => "InvalidDocumentName",
            AppError::UnsupportedFileType(_) => "UnsupportedFileType",
            AppError::UnsafeInput(_) => "UnsafeInput",
            AppError::NotFound(_) => "NotFound",
            AppError::BadRequest(_) => "BadRequest",
            AppError::UnsupportedOperation(_) => "UnsupportedOperation",
            AppError::NotVersioned(_) => "NotVersioned",
            AppError::NoPreviousVersion(_) => "NoPreviousVersion",
            AppError::StorageWrite { .. } => "StorageWriteError",
            AppError::StorageRead { .. } => "StorageReadError",
            AppError::Presign { .. } => "PresignError",
            AppError::InvalidPath(_) => "InvalidPath",
            AppError::Conflict(_) => "Conflict",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::Database(_) => "Database",
            AppError::Internal(_) | AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }

    /// Standard "document not found" error. Used for both absent records and
    /// records owned by another organization.
    pub fn document_not_found(id: impl std::fmt::Display) -> Self {
        AppError::NotFound(format!("Document {} not found", id))
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::InvalidDocumentName(ref msg) => msg.clone(),
            AppError::UnsupportedFileType(ref msg) => msg.clone(),
            // The rejected value is never echoed back.
            AppError::UnsafeInput(_) => "Input contains disallowed content".to_string(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::BadRequest(ref msg) => msg.clone(),
            AppError::UnsupportedOperation(ref msg) => msg.clone(),
            AppError::NotVersioned(ref msg) => msg.clone(),
            AppError::NoPreviousVersion(ref msg) => msg.clone(),
            AppError::StorageWrite { .. } => "Failed to write to storage".to_string(),
            AppError::StorageRead { .. } => "Failed to read from storage".to_string(),
            AppError::Presign { .. } => "Failed to generate upload URL".to_string(),
            AppError::InvalidPath(_) => "Invalid storage path".to_string(),
            AppError::Conflict(ref msg) => msg.clone(),
            AppError::PayloadTooLarge(ref msg) => msg.clone(),
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}
