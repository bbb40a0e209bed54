use crate::remote::{client_options, RemoteOps};
use crate::traits::{ByteStream, ObjectInfo, PutResult, Storage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use docvault_core::StorageVendor;
use http::Method;
use object_store::azure::{MicrosoftAzure, MicrosoftAzureBuilder};
use std::sync::Arc;
use std::time::Duration;

/// Settings for [`BlobStorage`].
#[derive(Debug, Clone)]
pub struct BlobStorageSettings {
    pub account: String,
    /// Shared key. When absent, the standard Azure environment variables apply.
    pub access_key: Option<String>,
    pub container: String,
    pub request_timeout: Duration,
}

/// Blob storage (Azure Blob Storage) implementation
#[derive(Clone)]
pub struct BlobStorage {
    store: Arc<MicrosoftAzure>,
    container: String,
    request_timeout: Duration,
}

impl BlobStorage {
    /// Build the client. No network call is made until the first operation.
    pub fn new(settings: BlobStorageSettings) -> StorageResult<Self> {
        let mut builder = MicrosoftAzureBuilder::from_env()
            .with_account(settings.account.clone())
            .with_container_name(settings.container.clone())
            .with_client_options(client_options(settings.request_timeout));

        if let Some(ref key) = settings.access_key {
            builder = builder.with_access_key(key.clone());
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(BlobStorage {
            store: Arc::new(store),
            container: settings.container,
            request_timeout: settings.request_timeout,
        })
    }

    fn ops(&self) -> RemoteOps<'_, MicrosoftAzure> {
        RemoteOps {
            store: &self.store,
            label: "blob_storage",
            container: &self.container,
            request_timeout: self.request_timeout,
        }
    }
}

#[async_trait]
impl Storage for BlobStorage {
    fn vendor(&self) -> StorageVendor {
        StorageVendor::BlobStorage
    }

    async fn put_object(&self, path: &str, data: Bytes) -> StorageResult<PutResult> {
        self.ops().put(path, data).await
    }

    async fn generate_presigned_upload_url(
        &self,
        path: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        self.ops().presign(Method::PUT, path, expires_in).await
    }

    async fn generate_presigned_download_url(
        &self,
        path: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        self.ops().presign(Method::GET, path, expires_in).await
    }

    async fn get_object(&self, path: &str) -> StorageResult<ByteStream> {
        self.ops().get(path).await
    }

    async fn head_object(&self, path: &str) -> StorageResult<ObjectInfo> {
        self.ops().head(path).await
    }

    async fn delete_object(&self, path: &str) -> StorageResult<()> {
        self.ops().delete(path).await
    }
}
