#[cfg(feature = "storage-azure")]
use crate::azure::{BlobStorage, BlobStorageSettings};
#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-s3")]
use crate::s3::{ObjectStorage, ObjectStorageSettings};
use crate::{Storage, StorageError, StorageResult};
use docvault_core::{StorageConfig, StorageVendor};
use std::collections::HashMap;
use std::sync::Arc;

/// Adapters keyed by vendor.
///
/// Records remember the vendor they were created with, so every configured
/// vendor stays registered even when it is no longer the active one.
#[derive(Clone, Default)]
pub struct StorageRegistry {
    adapters: HashMap<StorageVendor, Arc<dyn Storage>>,
    #[cfg(feature = "storage-local")]
    local: Option<Arc<LocalStorage>>,
}

impl StorageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under the vendor it reports.
    pub fn register(&mut self, adapter: Arc<dyn Storage>) {
        self.adapters.insert(adapter.vendor(), adapter);
    }

    /// Register the local adapter, keeping a typed handle for the serving path.
    #[cfg(feature = "storage-local")]
    pub fn register_local(&mut self, local: Arc<LocalStorage>) {
        self.adapters.insert(StorageVendor::Local, local.clone());
        self.local = Some(local);
    }

    pub fn get(&self, vendor: StorageVendor) -> StorageResult<Arc<dyn Storage>> {
        self.adapters.get(&vendor).cloned().ok_or_else(|| {
            StorageError::ConfigError(format!("Storage vendor {} is not configured", vendor))
        })
    }

    #[cfg(feature = "storage-local")]
    pub fn local(&self) -> Option<Arc<LocalStorage>> {
        self.local.clone()
    }

    pub fn vendors(&self) -> Vec<StorageVendor> {
        self.adapters.keys().copied().collect()
    }
}

/// Build a registry with every vendor that has complete settings.
pub async fn create_registry(config: &StorageConfig) -> StorageResult<StorageRegistry> {
    let mut registry = StorageRegistry::new();

    #[cfg(feature = "storage-local")]
    {
        let local = LocalStorage::new(config.local_storage_path.clone()).await?;
        tracing::info!(root = %local.root().display(), "Local storage registered");
        registry.register_local(Arc::new(local));
    }

    #[cfg(feature = "storage-s3")]
    if let Some(bucket) = config.s3_bucket.clone() {
        let storage = ObjectStorage::new(ObjectStorageSettings {
            bucket: bucket.clone(),
            region: config.s3_region.clone(),
            endpoint_url: config.s3_endpoint.clone(),
            access_key_id: None,
            secret_access_key: None,
            request_timeout: config.request_timeout(),
        })?;
        tracing::info!(bucket = %bucket, region = %config.s3_region, "Object storage registered");
        registry.register(Arc::new(storage));
    }

    #[cfg(feature = "storage-azure")]
    if let (Some(account), Some(container)) =
        (config.azure_account.clone(), config.azure_container.clone())
    {
        let storage = BlobStorage::new(BlobStorageSettings {
            account: account.clone(),
            access_key: config.azure_access_key.clone(),
            container: container.clone(),
            request_timeout: config.request_timeout(),
        })?;
        tracing::info!(account = %account, container = %container, "Blob storage registered");
        registry.register(Arc::new(storage));
    }

    if !registry.adapters.contains_key(&config.vendor) {
        return Err(StorageError::ConfigError(format!(
            "Active storage vendor {} is not available in this build",
            config.vendor
        )));
    }

    Ok(registry)
}
