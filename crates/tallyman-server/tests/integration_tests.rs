//! Integration tests for the HTTP service

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tallyman_domain::traits::PredictionStore;
use tallyman_domain::{
    CustomFieldValue, Document, DocumentId, FieldId, Prediction, PredictionRecord, ReceiptFields,
};
use tallyman_extractor::{Extractor, ExtractorConfig};
use tallyman_llm::MockProvider;
use tallyman_paperless::{ApiError, CustomField, DocumentApi};
use tallyman_server::handlers::{
    create_router, AppState, CorrelationOutcome, CorrelationResponse, ExtractResponse,
    HealthCheckResponse,
};
use tallyman_store::FilePredictionStore;
use tempfile::TempDir;
use tower::ServiceExt; // for oneshot

const AMOUNT: FieldId = FieldId::new(3);
const DATE: FieldId = FieldId::new(8);

/// In-memory document API
#[derive(Default)]
struct FakeDocuments {
    documents: Mutex<HashMap<DocumentId, Document>>,
}

impl FakeDocuments {
    fn with_document(self, id: u64, amount: Value, date: Value) -> Self {
        let document = Document {
            id: Some(DocumentId::new(id)),
            content: Some("Total 24.19".to_string()),
            custom_fields: vec![
                CustomFieldValue::new(FieldId::new(9), "note"),
                CustomFieldValue::new(AMOUNT, amount),
                CustomFieldValue::new(DATE, date),
            ],
        };
        self.documents
            .lock()
            .unwrap()
            .insert(DocumentId::new(id), document);
        self
    }
}

impl DocumentApi for FakeDocuments {
    async fn get_document(&self, id: DocumentId) -> Result<Document, ApiError> {
        self.documents
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(ApiError::Status {
                status: 404,
                body: r#"{"detail":"Not found."}"#.to_string(),
            })
    }

    async fn update_custom_fields(
        &self,
        _id: DocumentId,
        _fields: &[CustomFieldValue],
    ) -> Result<(), ApiError> {
        Ok(())
    }

    async fn list_custom_fields(&self) -> Result<Vec<CustomField>, ApiError> {
        Ok(Vec::new())
    }
}

struct TestApp {
    router: Router,
    store: Arc<FilePredictionStore>,
    llm: MockProvider,
    _dir: TempDir,
}

/// Document API that re-extracts the document while it is being fetched
struct ReextractingDocuments {
    inner: FakeDocuments,
    store: Arc<FilePredictionStore>,
    newer: PredictionRecord,
}

impl DocumentApi for ReextractingDocuments {
    async fn get_document(&self, id: DocumentId) -> Result<Document, ApiError> {
        self.store.store(&self.newer).unwrap();
        self.inner.get_document(id).await
    }

    async fn update_custom_fields(
        &self,
        id: DocumentId,
        fields: &[CustomFieldValue],
    ) -> Result<(), ApiError> {
        self.inner.update_custom_fields(id, fields).await
    }

    async fn list_custom_fields(&self) -> Result<Vec<CustomField>, ApiError> {
        self.inner.list_custom_fields().await
    }
}

fn create_test_app(llm: MockProvider, documents: FakeDocuments) -> TestApp {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FilePredictionStore::new(dir.path()));
    build_app(llm, documents, store, dir)
}

fn build_app<A: DocumentApi + 'static>(
    llm: MockProvider,
    documents: A,
    store: Arc<FilePredictionStore>,
    dir: TempDir,
) -> TestApp {
    let state = AppState {
        extractor: Arc::new(Extractor::new(llm.clone(), ExtractorConfig::default())),
        store: Arc::clone(&store),
        documents: Arc::new(documents),
        fields: ReceiptFields {
            amount: AMOUNT,
            purchase_date: DATE,
        },
    };

    TestApp {
        router: create_router(state),
        store,
        llm,
        _dir: dir,
    }
}

async fn post_json(router: Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

fn stored_record(doc_id: u64, amount: &str, date: &str) -> PredictionRecord {
    PredictionRecord::new(
        DocumentId::new(doc_id),
        &Prediction {
            amount: Some(amount.to_string()),
            purchase_date: Some(date.to_string()),
        },
        Some(amount.to_string()),
        Some(date.to_string()),
        Utc::now(),
    )
}

#[tokio::test]
async fn test_health_check_endpoint() {
    let app = create_test_app(MockProvider::default(), FakeDocuments::default());

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let health: HealthCheckResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.model, "mock");
}

#[tokio::test]
async fn test_extract_endpoint() {
    let llm = MockProvider::new(r#"{"amount": "$24.19", "purchase_date": "2025-11-26"}"#);
    let app = create_test_app(llm, FakeDocuments::default());

    let (status, body) = post_json(
        app.router,
        "/extract",
        r#"{"ocr": "ACME\nTOTAL $24.19\n11/26/25", "doc_id": 42}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let response: ExtractResponse = serde_json::from_value(body.clone()).unwrap();
    assert_eq!(response.amount.as_deref(), Some("24.19"));
    assert_eq!(response.purchase_date.as_deref(), Some("2025-11-26"));
    assert_eq!(body["amount_origin"], "extracted");
    assert_eq!(body["raw_amount"], "$24.19");
}

#[tokio::test]
async fn test_extract_empty_ocr_short_circuits() {
    let app = create_test_app(MockProvider::default(), FakeDocuments::default());

    let (status, body) = post_json(app.router.clone(), "/extract", r#"{"ocr": "  ", "doc_id": 1}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["amount"], Value::Null);
    assert_eq!(body["purchase_date"], Value::Null);

    let (status, body) = post_json(app.router, "/extract", r#"{"doc_id": 1}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["amount"], Value::Null);

    assert_eq!(app.llm.call_count(), 0);
}

#[tokio::test]
async fn test_extract_no_digits_gives_sentinels() {
    let app = create_test_app(MockProvider::new("{}"), FakeDocuments::default());

    let (status, body) = post_json(
        app.router,
        "/extract",
        r#"{"ocr": "Thank you for shopping", "doc_id": 5}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["amount"], "0.00");
    assert_eq!(body["purchase_date"], "1970-01-01");
    assert_eq!(body["amount_origin"], "fallback");
    assert_eq!(body["date_origin"], "fallback");
}

#[tokio::test]
async fn test_extract_model_failure_is_bad_gateway() {
    let mut llm = MockProvider::default();
    llm.add_error("TOTAL");
    let app = create_test_app(llm, FakeDocuments::default());

    let (status, body) = post_json(
        app.router,
        "/extract",
        r#"{"ocr": "TOTAL 5.00", "doc_id": 5}"#,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("LLM error"));
}

#[tokio::test]
async fn test_webhook_bad_doc_url() {
    let app = create_test_app(MockProvider::default(), FakeDocuments::default());

    for payload in [
        r#"{"doc_url": "http://paperless:8000/documents/abc/"}"#,
        r#"{"something": "else"}"#,
        "not json",
    ] {
        let (status, body) = post_json(app.router.clone(), "/paperless-webhook", payload)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload: {}", payload);
        assert_eq!(body["status"], "bad_doc_url");
    }
}

#[tokio::test]
async fn test_webhook_no_prediction() {
    let app = create_test_app(MockProvider::default(), FakeDocuments::default());

    let (status, body) = post_json(
        app.router,
        "/paperless-webhook",
        r#"{"doc_url": "http://paperless:8000/documents/77/"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let response: CorrelationResponse = serde_json::from_value(body).unwrap();
    assert_eq!(response.status, CorrelationOutcome::NoPrediction);
    assert_eq!(response.doc_id, Some(DocumentId::new(77)));
}

#[tokio::test]
async fn test_webhook_reconciles_and_persists() {
    let documents = FakeDocuments::default().with_document(
        12,
        json!("EUR24.19"),
        json!("2025-11-27"),
    );
    let app = create_test_app(MockProvider::default(), documents);
    app.store
        .store(&stored_record(12, "24.19", "2025-11-26"))
        .unwrap();

    let (status, body) = post_json(
        app.router,
        "/paperless-webhook",
        r#"{"url": "http://paperless:8000/documents/12/"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let response: CorrelationResponse = serde_json::from_value(body).unwrap();
    assert_eq!(response.status, CorrelationOutcome::Ok);
    let reconciliation = response.reconciliation.unwrap();
    assert!(reconciliation.amount.matches);
    assert!(!reconciliation.purchase_date.matches);
    assert_eq!(
        reconciliation.purchase_date.actual.as_deref(),
        Some("2025-11-27")
    );

    let stored = app.store.load(DocumentId::new(12)).unwrap().unwrap();
    assert_eq!(stored.reconciliation, Some(reconciliation));
}

#[tokio::test]
async fn test_webhook_unreadable_prediction() {
    let app = create_test_app(MockProvider::default(), FakeDocuments::default());
    std::fs::write(app.store.record_path(DocumentId::new(4)), "{ broken").unwrap();

    let (status, body) = post_json(
        app.router,
        "/paperless-webhook",
        r#"{"doc_url": "/documents/4/"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error_reading_prediction");
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_webhook_document_fetch_failure() {
    let app = create_test_app(MockProvider::default(), FakeDocuments::default());
    app.store
        .store(&stored_record(31, "9.99", "2024-01-01"))
        .unwrap();

    let (status, body) = post_json(
        app.router,
        "/paperless-webhook",
        r#"{"doc_url": "/documents/31/"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error_reading_prediction");
    assert!(body["detail"].as_str().unwrap().contains("404"));
}

#[tokio::test]
async fn test_webhook_keeps_prediction_written_during_correlation() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FilePredictionStore::new(dir.path()));
    let compared = stored_record(21, "10.00", "2025-01-01");
    store.store(&compared).unwrap();

    let mut newer = stored_record(21, "99.99", "2025-01-02");
    newer.extracted_at = compared.extracted_at + chrono::Duration::seconds(30);
    let documents = ReextractingDocuments {
        inner: FakeDocuments::default().with_document(21, json!("10.00"), json!("2025-01-01")),
        store: Arc::clone(&store),
        newer,
    };
    let app = build_app(MockProvider::default(), documents, Arc::clone(&store), dir);

    let (status, body) = post_json(
        app.router,
        "/paperless-webhook",
        r#"{"doc_url": "/documents/21/"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let response: CorrelationResponse = serde_json::from_value(body).unwrap();
    assert_eq!(response.status, CorrelationOutcome::Ok);
    assert!(response.reconciliation.unwrap().all_match());

    let stored = app.store.load(DocumentId::new(21)).unwrap().unwrap();
    assert_eq!(stored.amount_pred, "99.99");
    assert_eq!(stored.purchase_date_pred, "2025-01-02");
    assert!(stored.reconciliation.is_none());
}

#[tokio::test]
async fn test_webhook_accepts_several_link_keys() {
    let app = create_test_app(MockProvider::default(), FakeDocuments::default());

    let (status, body) = post_json(
        app.router,
        "/paperless-webhook",
        r#"{"url": "http://paperless:8000/documents/55/", "doc_url": "http://paperless:8000/documents/55/"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "no_prediction");
    assert_eq!(body["doc_id"], 55);
}
