use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Storage vendor types
///
/// A record's vendor is fixed when its placeholder is created; content is never
/// re-homed to a different vendor afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "storage_vendor", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum StorageVendor {
    ObjectStorage,
    BlobStorage,
    Local,
}

impl StorageVendor {
    /// Whether the vendor can mint presigned URLs for direct client transfers.
    pub fn supports_presign(&self) -> bool {
        !matches!(self, StorageVendor::Local)
    }
}

impl FromStr for StorageVendor {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "object_storage" | "object" | "s3" => Ok(StorageVendor::ObjectStorage),
            "blob_storage" | "blob" | "azure" => Ok(StorageVendor::BlobStorage),
            "local" | "local_fs" | "filesystem" => Ok(StorageVendor::Local),
            _ => Err(anyhow::anyhow!("Invalid storage vendor: {}", s)),
        }
    }
}

impl Display for StorageVendor {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageVendor::ObjectStorage => write!(f, "object_storage"),
            StorageVendor::BlobStorage => write!(f, "blob_storage"),
            StorageVendor::Local => write!(f, "local"),
        }
    }
}
