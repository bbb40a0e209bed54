//! Shared key generation for storage vendors.
//!
//! Un-versioned documents live at `documents/{org_id}/{document_id}.{ext}` and are
//! overwritten in place. Each version of a versioned document gets its own key,
//! `documents/{org_id}/{document_id}/{version_id}.{ext}`, so no upload can clobber
//! an earlier version.

use crate::traits::{StorageError, StorageResult};
use uuid::Uuid;

const KEY_PREFIX: &str = "documents";

fn with_extension(stem: String, extension: &str) -> String {
    if extension.is_empty() {
        stem
    } else {
        format!("{}.{}", stem, extension)
    }
}

/// Prefix shared by every key owned by `org_id`, trailing slash included.
pub fn org_prefix(org_id: Uuid) -> String {
    format!("{}/{}/", KEY_PREFIX, org_id)
}

/// Key for the single object backing an un-versioned document.
pub fn document_key(org_id: Uuid, document_id: Uuid, extension: &str) -> String {
    with_extension(
        format!("{}/{}/{}", KEY_PREFIX, org_id, document_id),
        extension,
    )
}

/// Key for one version of a versioned document.
pub fn version_key(org_id: Uuid, document_id: Uuid, version_id: Uuid, extension: &str) -> String {
    with_extension(
        format!("{}/{}/{}/{}", KEY_PREFIX, org_id, document_id, version_id),
        extension,
    )
}

/// Reject keys that are empty, absolute, contain `.`/`..` segments, backslashes
/// or null bytes.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if key.starts_with('/') || key.contains('\\') || key.contains('\0') {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    if key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(StorageError::InvalidKey(
            "Storage key contains an empty or relative segment".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_key_layout() {
        let org = Uuid::new_v4();
        let doc = Uuid::new_v4();
        assert_eq!(
            document_key(org, doc, "pdf"),
            format!("documents/{}/{}.pdf", org, doc)
        );
        assert_eq!(document_key(org, doc, ""), format!("documents/{}/{}", org, doc));
    }

    #[test]
    fn test_keys_share_org_prefix() {
        let org = Uuid::new_v4();
        let doc = Uuid::new_v4();
        let prefix = org_prefix(org);
        assert!(document_key(org, doc, "pdf").starts_with(&prefix));
        assert!(version_key(org, doc, Uuid::new_v4(), "").starts_with(&prefix));
        assert!(!document_key(Uuid::new_v4(), doc, "pdf").starts_with(&prefix));
    }

    #[test]
    fn test_version_keys_are_distinct() {
        let org = Uuid::new_v4();
        let doc = Uuid::new_v4();
        let a = version_key(org, doc, Uuid::new_v4(), "pdf");
        let b = version_key(org, doc, Uuid::new_v4(), "pdf");
        assert_ne!(a, b);
        assert_ne!(a, document_key(org, doc, "pdf"));
        assert!(validate_key(&a).is_ok());
    }

    #[test]
    fn test_validate_key_rejects_traversal() {
        for key in [
            "",
            "/etc/passwd",
            "../secret",
            "documents/../../etc/passwd",
            "documents/./x",
            "documents//x",
            "documents\\x",
            "documents/x\0y",
        ] {
            assert!(
                matches!(validate_key(key), Err(StorageError::InvalidKey(_))),
                "{:?} accepted",
                key
            );
        }
    }

    #[test]
    fn test_validate_key_allows_dots_inside_names() {
        assert!(validate_key("documents/org/report..final.pdf").is_ok());
        assert!(validate_key("documents/org/.hidden").is_ok());
    }
}
