//! Test helpers: build the router over an in-memory record store and a
//! temporary local storage root.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum_test::TestServer;
use bytes::Bytes;
use docvault_api::constants;
use docvault_api::setup::routes::build_router;
use docvault_api::state::AppState;
use docvault_core::{StaticVendorSelector, StorageVendor, VendorSelector};
use docvault_db::InMemoryDocumentRepository;
use docvault_services::{
    ByteStream, DocumentService, DocumentServiceSettings, LocalStorage, ObjectInfo, PutResult,
    Storage, StorageError, StorageRegistry, StorageResult,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;

/// Object storage stand-in that accepts writes and, on read, yields one chunk
/// and then fails.
pub struct BrokenStreamStorage;

pub const FIRST_CHUNK: &[u8] = b"first chunk";

#[async_trait]
impl Storage for BrokenStreamStorage {
    fn vendor(&self) -> StorageVendor {
        StorageVendor::ObjectStorage
    }

    async fn put_object(&self, path: &str, data: Bytes) -> StorageResult<PutResult> {
        Ok(PutResult {
            vendor_path: path.to_string(),
            size_in_bytes: data.len() as u64,
        })
    }

    async fn generate_presigned_upload_url(
        &self,
        path: &str,
        _expires_in: Duration,
    ) -> StorageResult<String> {
        Ok(format!("https://objects.test/{}", path))
    }

    async fn generate_presigned_download_url(
        &self,
        path: &str,
        _expires_in: Duration,
    ) -> StorageResult<String> {
        Ok(format!("https://objects.test/{}", path))
    }

    async fn get_object(&self, _path: &str) -> StorageResult<ByteStream> {
        let chunks: Vec<Result<Bytes, StorageError>> = vec![
            Ok(Bytes::from_static(FIRST_CHUNK)),
            Err(StorageError::DownloadFailed("connection reset by peer".to_string())),
        ];
        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    async fn head_object(&self, _path: &str) -> StorageResult<ObjectInfo> {
        Ok(ObjectInfo { size_in_bytes: 0 })
    }

    async fn delete_object(&self, _path: &str) -> StorageResult<()> {
        Ok(())
    }
}

pub const DEFAULT_MAX_UPLOAD: usize = 1024 * 1024;

/// API path prefix for tests (e.g. `/api/v0/documents`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", constants::API_PREFIX, path)
}

/// Test application: server, store and owned resources.
pub struct TestApp {
    pub server: TestServer,
    /// Same router the server wraps, for driving requests without buffering.
    pub router: Router,
    pub repository: Arc<InMemoryDocumentRepository>,
    pub org_id: Uuid,
    pub user_id: Uuid,
    pub _temp_dir: TempDir,
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with_limit(DEFAULT_MAX_UPLOAD).await
}

pub async fn setup_test_app_with_limit(max_upload_bytes: usize) -> TestApp {
    build_app(max_upload_bytes, StorageVendor::Local, None).await
}

/// App whose new documents go to `remote`, with local storage still registered.
pub async fn setup_test_app_with_remote(remote: Arc<dyn Storage>) -> TestApp {
    let vendor = remote.vendor();
    build_app(DEFAULT_MAX_UPLOAD, vendor, Some(remote)).await
}

async fn build_app(
    max_upload_bytes: usize,
    vendor: StorageVendor,
    remote: Option<Arc<dyn Storage>>,
) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let local = LocalStorage::new(temp_dir.path())
        .await
        .expect("local storage");

    let mut registry = StorageRegistry::new();
    registry.register_local(Arc::new(local));
    if let Some(remote) = remote {
        registry.register(remote);
    }

    let repository = Arc::new(InMemoryDocumentRepository::new());
    let selector: Arc<dyn VendorSelector> = Arc::new(StaticVendorSelector(vendor));
    let documents = DocumentService::new(
        repository.clone(),
        Arc::new(registry),
        selector.clone(),
        DocumentServiceSettings::default(),
    );

    let state = Arc::new(AppState::new(documents, selector, None));
    let router = build_router(state, max_upload_bytes);
    let server = TestServer::new(router.clone()).expect("test server");

    TestApp {
        server,
        router,
        repository,
        org_id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        _temp_dir: temp_dir,
    }
}

impl TestApp {
    /// Create a placeholder as this app's organization and return its JSON.
    pub async fn create(&self, name: &str, extension: &str, versioned: bool) -> Value {
        let response = self
            .server
            .post(&api_path("/documents"))
            .add_header("x-org-id", self.org_id.to_string())
            .add_header("x-user-id", self.user_id.to_string())
            .json(&json!({
                "document_name": name,
                "extension": extension,
                "is_versioned_file": versioned,
            }))
            .await;
        assert_eq!(response.status_code(), 201, "{}", response.text());
        response.json()
    }

    pub async fn upload(&self, id: &str, content: &'static [u8]) -> u16 {
        self.server
            .put(&api_path(&format!("/documents/{}/content", id)))
            .add_header("x-org-id", self.org_id.to_string())
            .bytes(content.into())
            .await
            .status_code()
            .as_u16()
    }
}

pub fn id_of(document: &Value) -> String {
    document
        .get("id")
        .and_then(|v| v.as_str())
        .expect("document id")
        .to_string()
}
