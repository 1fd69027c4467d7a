//! API integration tests for veriface-server.
//!
//! These tests drive the HTTP API with realistic multipart requests,
//! exercising the full upload → dedup → evaluate → decide → notify
//! flow against the in-memory store and scripted collaborators.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use veriface_core::{MockEvaluator, MockExtractor};
use veriface_server::notify::RecordingNotifier;
use veriface_server::pipeline::{Pipeline, PipelineSettings};
use veriface_server::storage::ArtifactStore;
use veriface_server::store::{MemoryStore, NewRequester, VerificationStore};
use veriface_server::{create_router, AppState, Config};

const API_KEY: &str = "test-api-key";
const CALLBACK_URL: &str = "http://callback.example/hook";

struct TestApp {
    router: Router,
    notifier: Arc<RecordingNotifier>,
    upload_dir: tempfile::TempDir,
}

impl TestApp {
    async fn new(evaluator: MockEvaluator) -> Self {
        Self::build(evaluator, RecordingNotifier::new(), true, true).await
    }

    /// Harness for a deployment with no working evaluator wired in.
    async fn degraded(evaluator: MockEvaluator) -> Self {
        Self::build(evaluator, RecordingNotifier::new(), true, false).await
    }

    async fn build(
        evaluator: MockEvaluator,
        notifier: RecordingNotifier,
        allow_redecision: bool,
        evaluator_configured: bool,
    ) -> Self {
        let upload_dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(notifier);
        let config = Arc::new(Config {
            allow_redecision,
            ..Config::default()
        });

        store
            .create_requester(NewRequester {
                name: "test".into(),
                api_key: API_KEY.into(),
                callback_url: Some(CALLBACK_URL.into()),
            })
            .await
            .unwrap();

        let artifacts = ArtifactStore::new(upload_dir.path());
        let pipeline = Arc::new(Pipeline::new(
            store.clone(),
            artifacts.clone(),
            Arc::new(MockExtractor::new()),
            Arc::new(evaluator),
            notifier.clone(),
            PipelineSettings {
                review_webhook_url: Some("http://review.example/hook".into()),
                public_base_url: "http://localhost:3000".into(),
                allow_redecision,
            },
        ));

        let state = AppState {
            config,
            store,
            pipeline,
            artifacts,
            evaluator_configured,
        };

        Self {
            router: create_router(state),
            notifier,
            upload_dir,
        }
    }

    async fn request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn upload(&self, photo: &[u8], api_key: Option<&str>) -> (StatusCode, Value) {
        let (content_type, body) = upload_multipart(photo, b"document bytes");
        let mut builder = Request::builder()
            .method("POST")
            .uri("/upload")
            .header("content-type", content_type);
        if let Some(key) = api_key {
            builder = builder.header("x-api-key", key);
        }
        self.request(builder.body(Body::from(body)).unwrap()).await
    }

    async fn get_dossier(&self, id: &str) -> (StatusCode, Value) {
        self.get_dossier_as(id, Some(API_KEY)).await
    }

    async fn get_dossier_as(&self, id: &str, api_key: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().uri(format!("/dossier/{id}"));
        if let Some(key) = api_key {
            builder = builder.header("x-api-key", key);
        }
        self.request(builder.body(Body::empty()).unwrap()).await
    }

    async fn decide(&self, body: Value) -> (StatusCode, Value) {
        self.request(
            Request::builder()
                .method("POST")
                .uri("/dossier/decision")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    fn stored_photo_count(&self) -> usize {
        match std::fs::read_dir(self.upload_dir.path().join("photos")) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }
}

/// Build a two-file multipart body: photo (PNG) and document (PDF).
fn upload_multipart(photo: &[u8], document: &[u8]) -> (String, Vec<u8>) {
    let boundary = "----TestBoundary7MA4YWxkTrZu0gW";
    let mut body = Vec::new();

    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"photo\"; filename=\"selfie.png\"\r\n",
    );
    body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
    body.extend_from_slice(photo);
    body.extend_from_slice(b"\r\n");

    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"document\"; filename=\"id.pdf\"\r\n",
    );
    body.extend_from_slice(b"Content-Type: application/pdf\r\n\r\n");
    body.extend_from_slice(document);
    body.extend_from_slice(b"\r\n");

    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

    (format!("multipart/form-data; boundary={}", boundary), body)
}

/// Multipart body with only the photo field, no document.
fn photo_only_multipart(photo: &[u8]) -> (String, Vec<u8>) {
    let boundary = "----TestBoundary7MA4YWxkTrZu0gW";
    let mut body = Vec::new();

    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"photo\"; filename=\"selfie.png\"\r\n",
    );
    body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
    body.extend_from_slice(photo);
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

    (format!("multipart/form-data; boundary={}", boundary), body)
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::new(MockEvaluator::approving()).await;
    let (status, json) = app
        .request(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["service"], "veriface-server");
    // The test harness wires a working evaluator into the pipeline
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["evaluator_configured"], true);
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_health_reports_degraded_without_evaluator() {
    let app = TestApp::degraded(MockEvaluator::failing()).await;
    let (status, json) = app
        .request(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["evaluator_configured"], false);
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_upload_requires_api_key() {
    let app = TestApp::new(MockEvaluator::approving()).await;

    let (status, json) = app.upload(b"face", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "UNAUTHORIZED");

    let (status, _) = app.upload(b"face", Some("wrong-key")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_dossier_lookup_requires_api_key() {
    let app = TestApp::new(MockEvaluator::approving()).await;

    let (_, json) = app.upload(b"face-auth", Some(API_KEY)).await;
    let dossier_id = json["data"]["id"].as_str().unwrap();

    // The key is checked before the dossier is even looked up
    let (status, body) = app.get_dossier_as(dossier_id, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = app.get_dossier_as(dossier_id, Some("wrong-key")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, unknown) = app
        .get_dossier_as(&uuid::Uuid::new_v4().to_string(), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown["code"], "UNAUTHORIZED");

    let (status, dossier) = app.get_dossier_as(dossier_id, Some(API_KEY)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dossier["id"], dossier_id);
}

// ============================================================================
// Upload flow
// ============================================================================

#[tokio::test]
async fn test_upload_clear_match_approves_and_notifies_once() {
    let app = TestApp::new(MockEvaluator::approving()).await;

    let (status, json) = app.upload(b"face-alpha", Some(API_KEY)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "APPROVED");
    assert!(json["data"]["id"].is_string());
    assert!(json["data"]["create"].is_string());

    let dossier_id = json["data"]["id"].as_str().unwrap();
    let (status, dossier) = app.get_dossier(dossier_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dossier["status"], "APPROVED");
    assert_eq!(dossier["decided_by"], "AUTOMATED");

    let calls = app.notifier.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, CALLBACK_URL);
    assert_eq!(calls[0].1.data.status, "APPROVED");
}

#[tokio::test]
async fn test_upload_clear_mismatch_rejects() {
    let app = TestApp::new(MockEvaluator::rejecting()).await;

    let (status, json) = app.upload(b"face-beta", Some(API_KEY)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "REJECTED");
    assert!(json["data"]["id"].is_string());
}

#[tokio::test]
async fn test_upload_missing_document_is_bad_request() {
    let app = TestApp::new(MockEvaluator::approving()).await;

    let (content_type, body) = photo_only_multipart(b"face");
    let (status, json) = app
        .request(
            Request::builder()
                .method("POST")
                .uri("/upload")
                .header("x-api-key", API_KEY)
                .header("content-type", content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_upload_rejects_pdf_photo() {
    let app = TestApp::new(MockEvaluator::approving()).await;

    let boundary = "----TestBoundary7MA4YWxkTrZu0gW";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"photo\"; filename=\"selfie.pdf\"\r\n",
    );
    body.extend_from_slice(b"Content-Type: application/pdf\r\n\r\n");
    body.extend_from_slice(b"face");
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

    let (status, _) = app
        .request(
            Request::builder()
                .method("POST")
                .uri("/upload")
                .header("x-api-key", API_KEY)
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={}", boundary),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Duplicate detection
// ============================================================================

#[tokio::test]
async fn test_duplicate_upload_rejected_with_original_id() {
    let app = TestApp::new(MockEvaluator::approving()).await;

    let (status, first) = app.upload(b"same-face-bytes", Some(API_KEY)).await;
    assert_eq!(status, StatusCode::OK);
    let dossier_id = first["data"]["id"].as_str().unwrap();
    let (_, dossier) = app.get_dossier(dossier_id).await;
    let original_photo_id = dossier["photo_id"].as_str().unwrap().to_string();
    assert_eq!(app.stored_photo_count(), 1);

    let (status, second) = app.upload(b"same-face-bytes", Some(API_KEY)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["data"]["status"], "REJECTED");
    assert!(second["data"]["id"].is_null());
    assert_eq!(second["data"]["original_image_id"], original_photo_id);

    // The duplicate's files were removed, no second dossier was
    // notified, and storage still holds exactly the first photo
    assert_eq!(app.stored_photo_count(), 1);
    assert_eq!(app.notifier.calls().len(), 1);
}

// ============================================================================
// Escalation and human review
// ============================================================================

#[tokio::test]
async fn test_escalation_stays_pending_then_human_approves() {
    let app = TestApp::new(MockEvaluator::escalating()).await;

    let (status, json) = app.upload(b"face-gamma", Some(API_KEY)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "PENDING");
    let dossier_id = json["data"]["id"].as_str().unwrap().to_string();

    // Exactly one PENDING notification, plus the review-channel ping
    let calls = app.notifier.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1.data.status, "PENDING");
    assert_eq!(app.notifier.pings().len(), 1);

    let (status, decided) = app
        .decide(serde_json::json!({
            "dossier_id": dossier_id,
            "status": "APPROVED",
            "observation": "verified manually",
            "reviewer_id": "reviewer-42"
        }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decided["data"]["status"], "APPROVED");

    let (_, dossier) = app.get_dossier(&dossier_id).await;
    assert_eq!(dossier["status"], "APPROVED");
    assert_eq!(dossier["decided_by"], "HUMAN");
    assert_eq!(dossier["observation"], "verified manually");

    // The human decision fired a second notification
    assert_eq!(app.notifier.calls().len(), 2);
    assert_eq!(app.notifier.calls()[1].1.data.status, "APPROVED");
}

#[tokio::test]
async fn test_evaluator_failure_returns_structured_pending() {
    let app = TestApp::new(MockEvaluator::failing()).await;

    let (status, json) = app.upload(b"face-delta", Some(API_KEY)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "PENDING");
    assert!(json["data"]["id"].is_string());
}

#[tokio::test]
async fn test_decision_validation_and_not_found() {
    let app = TestApp::new(MockEvaluator::escalating()).await;

    let (status, _) = app
        .decide(serde_json::json!({
            "dossier_id": uuid::Uuid::new_v4(),
            "status": "APPROVED",
            "observation": null,
            "reviewer_id": "reviewer-1"
        }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, json) = app.upload(b"face-epsilon", Some(API_KEY)).await;
    let dossier_id = json["data"]["id"].as_str().unwrap();

    // PENDING is not a valid decision target
    let (status, _) = app
        .decide(serde_json::json!({
            "dossier_id": dossier_id,
            "status": "PENDING",
            "observation": null,
            "reviewer_id": "reviewer-1"
        }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_redecision_conflict_when_disabled() {
    let app = TestApp::build(
        MockEvaluator::rejecting(),
        RecordingNotifier::new(),
        false,
        true,
    )
    .await;

    let (_, json) = app.upload(b"face-zeta", Some(API_KEY)).await;
    assert_eq!(json["data"]["status"], "REJECTED");
    let dossier_id = json["data"]["id"].as_str().unwrap();

    let (status, body) = app
        .decide(serde_json::json!({
            "dossier_id": dossier_id,
            "status": "APPROVED",
            "observation": "override attempt",
            "reviewer_id": "reviewer-9"
        }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}

// ============================================================================
// Notification resilience
// ============================================================================

#[tokio::test]
async fn test_notification_failure_never_fails_the_request() {
    let app = TestApp::build(
        MockEvaluator::approving(),
        RecordingNotifier::failing(),
        true,
        true,
    )
    .await;

    let (status, json) = app.upload(b"face-eta", Some(API_KEY)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "APPROVED");
    // The delivery was attempted and failed
    assert_eq!(app.notifier.calls().len(), 1);
}

// ============================================================================
// Lookups and file serving
// ============================================================================

#[tokio::test]
async fn test_get_unknown_dossier_is_not_found() {
    let app = TestApp::new(MockEvaluator::approving()).await;
    let (status, json) = app.get_dossier(&uuid::Uuid::new_v4().to_string()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_view_photo_and_document() {
    let app = TestApp::new(MockEvaluator::approving()).await;

    let (_, json) = app.upload(b"face-theta", Some(API_KEY)).await;
    let dossier_id = json["data"]["id"].as_str().unwrap();
    let (_, dossier) = app.get_dossier(dossier_id).await;
    let photo_id = dossier["photo_id"].as_str().unwrap();
    let document_id = dossier["document_id"].as_str().unwrap();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/view/photo/{photo_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "image/png"
    );
    let disposition = response
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(disposition.starts_with("inline"));
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"face-theta");

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/view/document/{document_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/pdf"
    );

    let (status, _) = app
        .request(
            Request::builder()
                .uri(format!("/view/photo/{}", uuid::Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
