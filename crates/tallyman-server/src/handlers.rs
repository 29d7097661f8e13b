//! HTTP request handlers for the extraction service.
//!
//! Implements the extraction endpoint, the webhook that correlates a
//! notification with the stored prediction, and a health check.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router as AxumRouter,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tallyman_domain::traits::{LlmProvider, PredictionStore};
use tallyman_domain::{
    null_to_none, value_text, DocumentId, FieldId, FieldOrigin, ReceiptFields, Reconciliation,
};
use tallyman_extractor::{ExtractionRequest, Extractor, ExtractorError};
use tallyman_paperless::DocumentApi;
use tallyman_store::FilePredictionStore;
use tracing::{error, info, warn};

/// Shared application state
pub struct AppState<L: LlmProvider, A> {
    /// Extraction pipeline over the loaded model
    pub extractor: Arc<Extractor<L>>,
    /// Prediction cache
    pub store: Arc<FilePredictionStore>,
    /// Document API, used to read current values during correlation
    pub documents: Arc<A>,
    /// Resolved IDs of the amount and date fields
    pub fields: ReceiptFields,
}

impl<L: LlmProvider, A> Clone for AppState<L, A> {
    fn clone(&self) -> Self {
        Self {
            extractor: Arc::clone(&self.extractor),
            store: Arc::clone(&self.store),
            documents: Arc::clone(&self.documents),
            fields: self.fields,
        }
    }
}

/// Extraction request body
#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    /// OCR text; missing is treated like empty
    #[serde(default)]
    pub ocr: Option<String>,
    /// Document the text came from
    pub doc_id: DocumentId,
}

/// Extraction response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ExtractResponse {
    /// Amount with two fraction digits; `0.00` when not found, null for no text
    pub amount: Option<String>,
    /// `YYYY-MM-DD`; `1970-01-01` when not found, null for no text
    pub purchase_date: Option<String>,
    /// Whether `amount` was read or substituted
    pub amount_origin: FieldOrigin,
    /// Whether `purchase_date` was read or substituted
    pub date_origin: FieldOrigin,
    /// Amount as the model wrote it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_amount: Option<String>,
    /// Purchase date as the model wrote it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_purchase_date: Option<String>,
}

/// Webhook payload sent by the document system
///
/// The document link may arrive under any of three keys. The last path
/// segment of the link is the document ID.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    /// Link to the document
    #[serde(default)]
    pub doc_url: Option<String>,
    /// Link to the document
    #[serde(default)]
    pub url: Option<String>,
    /// Link to the document
    #[serde(default)]
    pub document_url: Option<String>,
}

impl WebhookPayload {
    /// Document ID from the first link that names one
    pub fn doc_id(&self) -> Option<DocumentId> {
        [&self.doc_url, &self.url, &self.document_url]
            .into_iter()
            .flatten()
            .find_map(|link| doc_id_from_url(link))
    }
}

/// Result of correlating a notification with a stored prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationOutcome {
    /// The payload did not name a document
    BadDocUrl,
    /// No prediction has been stored for the document
    NoPrediction,
    /// The prediction or the document could not be read
    ErrorReadingPrediction,
    /// Prediction found and compared
    Ok,
}

impl CorrelationOutcome {
    /// HTTP status reported for this outcome
    pub fn status_code(self) -> StatusCode {
        match self {
            CorrelationOutcome::BadDocUrl => StatusCode::BAD_REQUEST,
            CorrelationOutcome::ErrorReadingPrediction => StatusCode::INTERNAL_SERVER_ERROR,
            CorrelationOutcome::NoPrediction | CorrelationOutcome::Ok => StatusCode::OK,
        }
    }
}

/// Webhook response body
#[derive(Debug, Serialize, Deserialize)]
pub struct CorrelationResponse {
    /// Outcome code
    pub status: CorrelationOutcome,
    /// Document the notification referred to, when it could be parsed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<DocumentId>,
    /// Comparison of stored prediction and current values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconciliation: Option<Reconciliation>,
    /// Error detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl CorrelationResponse {
    fn new(status: CorrelationOutcome, doc_id: Option<DocumentId>) -> Self {
        Self {
            status,
            doc_id,
            reconciliation: None,
            detail: None,
        }
    }

    fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl IntoResponse for CorrelationResponse {
    fn into_response(self) -> Response {
        (self.status.status_code(), Json(self)).into_response()
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// Overall health status
    pub status: String,
    /// Model answering extraction requests
    pub model: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// The model could not produce an answer
    Extraction(ExtractorError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Extraction(e) => (StatusCode::BAD_GATEWAY, e.to_string()),
        };

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

impl From<ExtractorError> for AppError {
    fn from(e: ExtractorError) -> Self {
        AppError::Extraction(e)
    }
}

/// POST /extract - Extract amount and purchase date from OCR text
async fn extract<L, A>(
    State(state): State<AppState<L, A>>,
    Json(request): Json<ExtractRequest>,
) -> Result<Json<ExtractResponse>, AppError>
where
    L: LlmProvider + Send + Sync + 'static,
    L::Error: std::fmt::Display,
    A: DocumentApi + 'static,
{
    let text = request.ocr.unwrap_or_default();
    let result = state
        .extractor
        .extract(ExtractionRequest::new(request.doc_id, text))
        .await
        .map_err(|e| {
            error!(doc_id = %request.doc_id, error = %e, "Extraction failed");
            AppError::from(e)
        })?;

    let extraction = result.extraction;
    Ok(Json(ExtractResponse {
        amount: extraction.prediction.amount,
        purchase_date: extraction.prediction.purchase_date,
        amount_origin: extraction.amount_origin,
        date_origin: extraction.date_origin,
        raw_amount: extraction.raw_amount,
        raw_purchase_date: extraction.raw_purchase_date,
    }))
}

/// POST /paperless-webhook - Correlate a notification with the stored prediction
async fn paperless_webhook<L, A>(
    State(state): State<AppState<L, A>>,
    body: Bytes,
) -> CorrelationResponse
where
    L: LlmProvider + Send + Sync + 'static,
    A: DocumentApi + 'static,
{
    let doc_id = match serde_json::from_slice::<WebhookPayload>(&body) {
        Ok(payload) => payload.doc_id(),
        Err(e) => {
            warn!(error = %e, "Webhook payload is not valid JSON");
            None
        }
    };
    let Some(doc_id) = doc_id else {
        warn!("Webhook did not reference a document");
        return CorrelationResponse::new(CorrelationOutcome::BadDocUrl, None);
    };

    let record = match state.store.load(doc_id) {
        Ok(Some(record)) => record,
        Ok(None) => {
            info!(doc_id = %doc_id, "No prediction stored yet");
            return CorrelationResponse::new(CorrelationOutcome::NoPrediction, Some(doc_id));
        }
        Err(e) => {
            error!(doc_id = %doc_id, error = %e, "Failed to read prediction");
            return CorrelationResponse::new(CorrelationOutcome::ErrorReadingPrediction, Some(doc_id))
                .with_detail(e.to_string());
        }
    };

    let document = match state.documents.get_document(doc_id).await {
        Ok(document) => document,
        Err(e) => {
            error!(doc_id = %doc_id, error = %e, "Failed to fetch document for correlation");
            return CorrelationResponse::new(CorrelationOutcome::ErrorReadingPrediction, Some(doc_id))
                .with_detail(e.to_string());
        }
    };

    let current = |field: FieldId| null_to_none(document.field_value(field)).and_then(value_text);
    let reconciliation = Reconciliation::compare(
        &record,
        current(state.fields.amount),
        current(state.fields.purchase_date),
        Utc::now(),
    );

    if reconciliation.all_match() {
        info!(doc_id = %doc_id, "Document still holds the predicted values");
    } else {
        info!(
            doc_id = %doc_id,
            predicted_amount = %reconciliation.amount.predicted,
            actual_amount = ?reconciliation.amount.actual,
            predicted_date = %reconciliation.purchase_date.predicted,
            actual_date = ?reconciliation.purchase_date.actual,
            "Document values differ from prediction"
        );
    }

    if let Err(e) = state.store.store_reconciliation(doc_id, &reconciliation) {
        error!(doc_id = %doc_id, error = %e, "Failed to persist reconciliation");
        return CorrelationResponse::new(CorrelationOutcome::ErrorReadingPrediction, Some(doc_id))
            .with_detail(e.to_string());
    }

    let mut response = CorrelationResponse::new(CorrelationOutcome::Ok, Some(doc_id));
    response.reconciliation = Some(reconciliation);
    response
}

/// GET /health - Health check
async fn health_check<L, A>(State(state): State<AppState<L, A>>) -> Json<HealthCheckResponse>
where
    L: LlmProvider + Send + Sync + 'static,
    L::Error: std::fmt::Display,
{
    Json(HealthCheckResponse {
        status: "ok".to_string(),
        model: state.extractor.model_name().to_string(),
    })
}

/// Document ID from the last path segment of a URL
///
/// Accepts absolute URLs and bare paths, with or without a trailing slash.
pub fn doc_id_from_url(url: &str) -> Option<DocumentId> {
    let path = url.split(['?', '#']).next()?.trim().trim_end_matches('/');
    let segment = path.rsplit('/').next()?;
    segment.parse().ok()
}

/// Create the axum router with all routes
pub fn create_router<L, A>(state: AppState<L, A>) -> AxumRouter
where
    L: LlmProvider + Send + Sync + 'static,
    L::Error: std::fmt::Display,
    A: DocumentApi + 'static,
{
    AxumRouter::new()
        .route("/extract", post(extract::<L, A>))
        .route("/paperless-webhook", post(paperless_webhook::<L, A>))
        .route("/health", get(health_check::<L, A>))
        .with_state(state)
}
