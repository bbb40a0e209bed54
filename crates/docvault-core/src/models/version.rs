use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One stored revision of a document's content.
///
/// Un-versioned records carry exactly one version that is replaced in place;
/// versioned records append a new entry per upload. Ordinals are unique per
/// document and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentVersion {
    pub id: Uuid,
    pub document_id: Uuid,
    pub version_number: i32,
    pub document_path: String,
    pub size_in_bytes: i64,
    /// SHA-256 of the content, lowercase hex. `None` for direct uploads that
    /// were never read back by the service.
    pub content_hash: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl DocumentVersion {
    pub fn new(
        document_id: Uuid,
        version_number: i32,
        document_path: String,
        size_in_bytes: i64,
        content_hash: Option<String>,
        created_by: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            version_number,
            document_path,
            size_in_bytes,
            content_hash,
            created_by,
            created_at: Utc::now(),
        }
    }
}
