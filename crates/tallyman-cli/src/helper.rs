//! Client for the extraction endpoint.

use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tallyman_domain::{DocumentId, Extraction, FieldOrigin, Prediction};
use tracing::debug;

/// Something that turns OCR text into a prediction
pub trait ExtractionSource: Send + Sync {
    /// Extract amount and purchase date from one document's text
    fn extract(
        &self,
        doc_id: DocumentId,
        ocr: &str,
    ) -> impl Future<Output = Result<Extraction>> + Send;
}

#[derive(Debug, Serialize)]
struct ExtractBody<'a> {
    ocr: &'a str,
    doc_id: DocumentId,
}

#[derive(Debug, Default, Deserialize)]
struct ExtractReply {
    #[serde(default)]
    amount: Option<String>,
    #[serde(default)]
    purchase_date: Option<String>,
    #[serde(default)]
    amount_origin: Option<FieldOrigin>,
    #[serde(default)]
    date_origin: Option<FieldOrigin>,
    #[serde(default)]
    raw_amount: Option<String>,
    #[serde(default)]
    raw_purchase_date: Option<String>,
}

impl ExtractReply {
    /// Origins the endpoint omits follow from whether a value was returned
    fn into_extraction(self) -> Extraction {
        let amount_origin = self
            .amount_origin
            .unwrap_or_else(|| origin_of(self.amount.as_deref()));
        let date_origin = self
            .date_origin
            .unwrap_or_else(|| origin_of(self.purchase_date.as_deref()));

        Extraction {
            prediction: Prediction {
                amount: self.amount,
                purchase_date: self.purchase_date,
            },
            amount_origin,
            date_origin,
            raw_amount: self.raw_amount,
            raw_purchase_date: self.raw_purchase_date,
        }
    }
}

fn origin_of(value: Option<&str>) -> FieldOrigin {
    match value {
        Some(v) if !v.is_empty() => FieldOrigin::Extracted,
        _ => FieldOrigin::Fallback,
    }
}

/// HTTP client for `POST /extract`
#[derive(Debug, Clone)]
pub struct HelperClient {
    base_url: String,
    http: reqwest::Client,
}

impl HelperClient {
    /// Create a client for the endpoint at `base_url`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CliError::Helper(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }
}

impl ExtractionSource for HelperClient {
    async fn extract(&self, doc_id: DocumentId, ocr: &str) -> Result<Extraction> {
        let url = format!("{}/extract", self.base_url);
        debug!(%doc_id, %url, ocr_len = ocr.len(), "Calling extraction endpoint");

        let response = self
            .http
            .post(&url)
            .json(&ExtractBody { ocr, doc_id })
            .send()
            .await
            .map_err(|e| CliError::Helper(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CliError::Helper(e.to_string()))?;
        if !status.is_success() {
            return Err(CliError::Helper(format!("HTTP {}: {}", status.as_u16(), text)));
        }

        // An empty body carries no values
        let reply: ExtractReply = if text.trim().is_empty() {
            ExtractReply::default()
        } else {
            serde_json::from_str(&text)?
        };

        Ok(reply.into_extraction())
    }
}
