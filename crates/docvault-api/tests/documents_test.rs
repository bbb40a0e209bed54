mod helpers;

use docvault_core::StorageVendor;
use docvault_db::{DocumentChange, DocumentRepository, VersionWrite};
use axum::body::{to_bytes, Body};
use axum::http::Request;
use helpers::{
    api_path, id_of, setup_test_app, setup_test_app_with_limit, setup_test_app_with_remote,
    BrokenStreamStorage,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

#[tokio::test]
async fn test_upload_then_download_round_trip() {
    let app = setup_test_app().await;
    let document = app.create("quarterly report", "pdf", false).await;
    let id = id_of(&document);

    assert_eq!(app.upload(&id, b"%PDF-1.7 body").await, 200);

    let response = app
        .server
        .get(&api_path(&format!("/documents/{}/content", id)))
        .add_header("x-org-id", app.org_id.to_string())
        .await;

    assert_eq!(response.status_code(), 200);
    assert_eq!(response.as_bytes().as_ref(), b"%PDF-1.7 body");
    assert_eq!(response.header("content-type"), "application/pdf");
    assert_eq!(response.header("x-content-type-options"), "nosniff");
    assert_eq!(response.header("content-length"), "13");
    let disposition = response.header("content-disposition");
    let disposition = disposition.to_str().expect("ascii header");
    assert!(disposition.starts_with("attachment"));
    assert!(disposition.contains("quarterly%20report.pdf"));
}

#[tokio::test]
async fn test_non_ascii_filename_is_encoded() {
    let app = setup_test_app().await;
    let id = id_of(&app.create("résumé", "txt", false).await);
    assert_eq!(app.upload(&id, b"hello").await, 200);

    let response = app
        .server
        .get(&api_path(&format!("/documents/{}/content", id)))
        .add_header("x-org-id", app.org_id.to_string())
        .await;

    assert_eq!(response.status_code(), 200);
    let disposition = response.header("content-disposition");
    let disposition = disposition.to_str().expect("header must stay ascii");
    assert!(disposition.contains("filename*=UTF-8''r%C3%A9sum%C3%A9.txt"));
}

#[tokio::test]
async fn test_missing_org_header_is_unauthorized() {
    let app = setup_test_app().await;

    let response = app
        .server
        .post(&api_path("/documents"))
        .json(&json!({ "document_name": "a", "extension": "txt" }))
        .await;

    assert_eq!(response.status_code(), 401);
    let body: Value = response.json();
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_malformed_org_header_is_rejected() {
    let app = setup_test_app().await;

    let response = app
        .server
        .get(&api_path(&format!("/documents/{}", Uuid::new_v4())))
        .add_header("x-org-id", "not-a-uuid")
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_IDENTITY");
}

#[tokio::test]
async fn test_other_organization_sees_not_found() {
    let app = setup_test_app().await;
    let id = id_of(&app.create("contract", "pdf", false).await);
    assert_eq!(app.upload(&id, b"signed").await, 200);

    let stranger = Uuid::new_v4().to_string();
    for path in [
        format!("/documents/{}", id),
        format!("/documents/{}/content", id),
        format!("/documents/{}/versions", id),
    ] {
        let response = app
            .server
            .get(&api_path(&path))
            .add_header("x-org-id", stranger.clone())
            .await;
        assert_eq!(response.status_code(), 404, "{}", path);
        let body: Value = response.json();
        assert_eq!(body["code"], "NOT_FOUND");
    }

    let response = app
        .server
        .delete(&api_path(&format!("/documents/{}", id)))
        .add_header("x-org-id", stranger)
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_invalid_name_is_rejected() {
    let app = setup_test_app().await;

    let response = app
        .server
        .post(&api_path("/documents"))
        .add_header("x-org-id", app.org_id.to_string())
        .json(&json!({ "document_name": "../../etc/passwd", "extension": "txt" }))
        .await;

    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = setup_test_app().await;

    let response = app
        .server
        .post(&api_path("/documents"))
        .add_header("x-org-id", app.org_id.to_string())
        .add_header("content-type", "application/json")
        .text("{ not json")
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_tampered_local_path_is_refused() {
    let app = setup_test_app().await;
    let id = id_of(&app.create("notes", "txt", false).await);
    assert_eq!(app.upload(&id, b"original").await, 200);

    let document_id: Uuid = id.parse().expect("uuid");
    let record = app
        .repository
        .get(app.org_id, document_id)
        .await
        .expect("get")
        .expect("record");
    let mut version = app
        .repository
        .list_versions(app.org_id, document_id)
        .await
        .expect("versions")
        .remove(0);
    version.document_path = "file:///etc/passwd".to_string();

    let mut tampered = record.clone();
    tampered.document_path = Some(version.document_path.clone());
    app.repository
        .commit(DocumentChange::from_loaded(tampered).with_version(VersionWrite::Replace(version)))
        .await
        .expect("commit");

    let response = app
        .server
        .get(&api_path(&format!("/documents/{}/content", id)))
        .add_header("x-org-id", app.org_id.to_string())
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_PATH");
}

#[tokio::test]
async fn test_local_vendor_has_no_presigned_urls() {
    let app = setup_test_app().await;
    let document = app.create("scan", "png", false).await;
    assert_eq!(document["storage_vendor"], json!(StorageVendor::Local));
    let id = id_of(&document);

    let response = app
        .server
        .get(&api_path(&format!("/documents/{}/download-url", id)))
        .add_header("x-org-id", app.org_id.to_string())
        .await;
    assert_eq!(response.status_code(), 501);

    let response = app
        .server
        .post(&api_path(&format!("/documents/{}/upload-url", id)))
        .add_header("x-org-id", app.org_id.to_string())
        .await;
    assert!(response.status_code() == 400 || response.status_code() == 501);
}

#[tokio::test]
async fn test_versions_and_rollback() {
    let app = setup_test_app().await;
    let id = id_of(&app.create("design", "txt", true).await);
    let org = app.org_id.to_string();

    let response = app
        .server
        .post(&api_path(&format!("/documents/{}/rollback", id)))
        .add_header("x-org-id", org.clone())
        .await;
    assert_eq!(response.status_code(), 409);

    for content in [&b"first"[..], &b"second"[..]] {
        let response = app
            .server
            .post(&api_path(&format!("/documents/{}/versions", id)))
            .add_header("x-org-id", org.clone())
            .bytes(content.to_vec().into())
            .await;
        assert_eq!(response.status_code(), 201);
    }

    let response = app
        .server
        .get(&api_path(&format!("/documents/{}/versions", id)))
        .add_header("x-org-id", org.clone())
        .await;
    let versions: Vec<Value> = response.json();
    assert_eq!(versions.len(), 2);

    let response = app
        .server
        .post(&api_path(&format!("/documents/{}/rollback", id)))
        .add_header("x-org-id", org.clone())
        .await;
    assert_eq!(response.status_code(), 200);
    let record: Value = response.json();
    assert_eq!(record["state"], "rolled_back");

    let response = app
        .server
        .get(&api_path(&format!("/documents/{}/content", id)))
        .add_header("x-org-id", org)
        .await;
    assert_eq!(response.as_bytes().as_ref(), b"first");
}

#[tokio::test]
async fn test_rollback_on_unversioned_document_conflicts() {
    let app = setup_test_app().await;
    let id = id_of(&app.create("memo", "txt", false).await);
    assert_eq!(app.upload(&id, b"v1").await, 200);

    let response = app
        .server
        .post(&api_path(&format!("/documents/{}/rollback", id)))
        .add_header("x-org-id", app.org_id.to_string())
        .await;

    assert_eq!(response.status_code(), 409);
}

#[tokio::test]
async fn test_is_modified() {
    let app = setup_test_app().await;
    let id = id_of(&app.create("sheet", "csv", false).await);
    assert_eq!(app.upload(&id, b"abc").await, 200);

    // SHA-256 of "abc"
    let same = "BA7816BF8F01CFEA414140DE5DAE2223B00361A396177A9CB410FF61F20015AD";
    let response = app
        .server
        .post(&api_path(&format!("/documents/{}/is-modified", id)))
        .add_header("x-org-id", app.org_id.to_string())
        .json(&json!({ "hash": same }))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["modified"], false);

    let response = app
        .server
        .post(&api_path(&format!("/documents/{}/is-modified", id)))
        .add_header("x-org-id", app.org_id.to_string())
        .json(&json!({ "hash": "00" }))
        .await;
    let body: Value = response.json();
    assert_eq!(body["modified"], true);
}

#[tokio::test]
async fn test_delete_is_idempotent_and_hides_record() {
    let app = setup_test_app().await;
    let id = id_of(&app.create("draft", "txt", false).await);
    assert_eq!(app.upload(&id, b"draft").await, 200);

    for _ in 0..2 {
        let response = app
            .server
            .delete(&api_path(&format!("/documents/{}", id)))
            .add_header("x-org-id", app.org_id.to_string())
            .await;
        assert_eq!(response.status_code(), 204);
    }

    let response = app
        .server
        .get(&api_path(&format!("/documents/{}", id)))
        .add_header("x-org-id", app.org_id.to_string())
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let app = setup_test_app_with_limit(16).await;
    let id = id_of(&app.create("big", "zip", false).await);

    let response = app
        .server
        .put(&api_path(&format!("/documents/{}/content", id)))
        .add_header("x-org-id", app.org_id.to_string())
        .bytes(vec![0u8; 64].into())
        .await;

    assert_eq!(response.status_code(), 413);
}

#[tokio::test]
async fn test_health_reports_vendors() {
    let app = setup_test_app().await;

    let response = app.server.get("/health").await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "in_memory");
    assert_eq!(body["active_vendor"], "local");
    assert_eq!(body["vendors"], json!(["local"]));
}

#[tokio::test]
async fn test_unknown_route_is_json_not_found() {
    let app = setup_test_app().await;

    let response = app.server.get("/api/v0/nothing-here").await;

    assert_eq!(response.status_code(), 404);
    let body: Value = response.json();
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_stream_failure_after_headers_aborts_body() {
    let app = setup_test_app_with_remote(Arc::new(BrokenStreamStorage)).await;
    let document = app.create("export", "csv", false).await;
    assert_eq!(document["storage_vendor"], json!(StorageVendor::ObjectStorage));
    let id = id_of(&document);
    assert_eq!(app.upload(&id, b"a,b,c\n1,2,3\n").await, 200);

    let request = Request::builder()
        .uri(api_path(&format!("/documents/{}/content", id)))
        .header("x-org-id", app.org_id.to_string())
        .body(Body::empty())
        .expect("request");
    let response = app.router.clone().oneshot(request).await.expect("response");

    assert_eq!(response.status(), 200);
    let headers = response.headers();
    assert_eq!(headers["content-type"], "text/csv");
    assert_eq!(headers["content-length"], "12");
    assert!(headers["content-disposition"]
        .to_str()
        .expect("ascii header")
        .contains("export.csv"));

    let body = to_bytes(response.into_body(), usize::MAX).await;
    assert!(body.is_err(), "body should abort once the stream fails");
}
