use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::storage_types::StorageVendor;

/// Lifecycle state of a document record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "document_state", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum DocumentState {
    /// Metadata only, no bytes written yet.
    Placeholder,
    Uploaded,
    Versioned,
    RolledBack,
    Deleted,
}

impl std::fmt::Display for DocumentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DocumentState::Placeholder => "placeholder",
            DocumentState::Uploaded => "uploaded",
            DocumentState::Versioned => "versioned",
            DocumentState::RolledBack => "rolled_back",
            DocumentState::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

/// The unit of storage identity: one record per logical document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: Uuid,
    pub org_id: Uuid,
    pub document_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternate_document_name: Option<String>,
    pub extension: String,
    pub size_in_bytes: i64,
    /// Vendor locator: object key, blob path or `file://` URI.
    pub document_path: Option<String>,
    pub storage_vendor: StorageVendor,
    pub is_versioned_file: bool,
    pub permissions: JsonValue,
    pub custom_metadata: JsonValue,
    pub initiator_user_id: Option<Uuid>,
    pub state: DocumentState,
    pub current_version_id: Option<Uuid>,
    /// Optimistic concurrency counter, bumped on every committed mutation.
    pub lock_version: i64,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DocumentRecord {
    /// Filename presented to downloaders: `name.ext`, or the bare name when
    /// there is no extension.
    pub fn file_name(&self) -> String {
        if self.extension.is_empty() {
            self.document_name.clone()
        } else {
            format!("{}.{}", self.document_name, self.extension)
        }
    }

    /// Whether any content has been committed for this record.
    pub fn has_content(&self) -> bool {
        self.current_version_id.is_some()
    }
}

/// Input for placeholder creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewDocument {
    pub document_name: String,
    #[serde(default)]
    pub alternate_document_name: Option<String>,
    pub extension: String,
    #[serde(default)]
    pub size_in_bytes: i64,
    /// Optional pre-assigned storage key for client-driven direct uploads.
    #[serde(default)]
    pub document_path: Option<String>,
    #[serde(default)]
    pub is_versioned_file: bool,
    #[serde(default)]
    pub permissions: Option<JsonValue>,
    #[serde(default)]
    pub custom_metadata: Option<JsonValue>,
}

/// A time-limited URL a client can use to transfer bytes directly against the vendor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresignedUpload {
    pub url: String,
    pub method: String,
    pub document_path: String,
    pub expires_at: DateTime<Utc>,
}
