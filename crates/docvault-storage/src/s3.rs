use crate::remote::{client_options, RemoteOps};
use crate::traits::{ByteStream, ObjectInfo, PutResult, Storage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use docvault_core::StorageVendor;
use http::Method;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use std::time::Duration;

/// Settings for [`ObjectStorage`].
#[derive(Debug, Clone)]
pub struct ObjectStorageSettings {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible providers
    /// (e.g. "http://localhost:9000" for MinIO)
    pub endpoint_url: Option<String>,
    /// Static credentials. When absent, the standard AWS environment variables apply.
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub request_timeout: Duration,
}

/// Object storage (S3 and S3-compatible) implementation
#[derive(Clone)]
pub struct ObjectStorage {
    store: AmazonS3,
    bucket: String,
    request_timeout: Duration,
}

impl ObjectStorage {
    /// Build the client. No network call is made until the first operation.
    pub fn new(settings: ObjectStorageSettings) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(settings.region.clone())
            .with_bucket_name(settings.bucket.clone())
            .with_client_options(client_options(settings.request_timeout));

        if let Some(ref endpoint) = settings.endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        if let (Some(key_id), Some(secret)) =
            (&settings.access_key_id, &settings.secret_access_key)
        {
            builder = builder
                .with_access_key_id(key_id.clone())
                .with_secret_access_key(secret.clone());
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(ObjectStorage {
            store,
            bucket: settings.bucket,
            request_timeout: settings.request_timeout,
        })
    }

    fn ops(&self) -> RemoteOps<'_, AmazonS3> {
        RemoteOps {
            store: &self.store,
            label: "object_storage",
            container: &self.bucket,
            request_timeout: self.request_timeout,
        }
    }
}

#[async_trait]
impl Storage for ObjectStorage {
    fn vendor(&self) -> StorageVendor {
        StorageVendor::ObjectStorage
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

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ObjectStorageSettings {
        ObjectStorageSettings {
            bucket: "docvault-test".to_string(),
            region: "us-east-1".to_string(),
            endpoint_url: None,
            access_key_id: Some("AKIDEXAMPLE".to_string()),
            secret_access_key: Some("wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string()),
            request_timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_presigned_upload_url_is_signed_locally() {
        let storage = ObjectStorage::new(settings()).unwrap();
        let url = storage
            .generate_presigned_upload_url("documents/org/doc.pdf", Duration::from_secs(900))
            .await
            .unwrap();

        assert!(url.contains("documents/org/doc.pdf"));
        assert!(url.contains("X-Amz-Signature="));
        assert!(url.contains("X-Amz-Expires=900"));
    }

    #[tokio::test]
    async fn test_presign_rejects_invalid_key() {
        let storage = ObjectStorage::new(settings()).unwrap();
        let result = storage
            .generate_presigned_upload_url("../escape", Duration::from_secs(60))
            .await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[test]
    fn test_vendor() {
        let storage = ObjectStorage::new(settings()).unwrap();
        assert_eq!(storage.vendor(), StorageVendor::ObjectStorage);
    }
}
