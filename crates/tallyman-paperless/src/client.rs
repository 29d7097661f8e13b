//! Paperless document API client.

use crate::config::PaperlessConfig;
use crate::error::ApiError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tallyman_domain::{CustomFieldValue, Document, DocumentId, FieldId};
use tracing::{debug, error};

/// A custom field definition as listed by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomField {
    /// Field ID
    pub id: FieldId,
    /// Human-readable name
    pub name: String,
    /// Declared data type (`monetary`, `date`, ...)
    #[serde(default)]
    pub data_type: Option<String>,
}

/// One page of a paginated listing
#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default)]
    next: Option<String>,
    results: Vec<T>,
}

#[derive(Debug, Serialize)]
struct CustomFieldsPatch<'a> {
    custom_fields: &'a [CustomFieldValue],
}

/// Operations the pipeline needs from the document API
pub trait DocumentApi: Send + Sync {
    /// Fetch a document's content and custom field values
    fn get_document(
        &self,
        id: DocumentId,
    ) -> impl Future<Output = Result<Document, ApiError>> + Send;

    /// Replace a document's full custom field list
    fn update_custom_fields(
        &self,
        id: DocumentId,
        fields: &[CustomFieldValue],
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// List every custom field definition
    fn list_custom_fields(&self) -> impl Future<Output = Result<Vec<CustomField>, ApiError>> + Send;
}

/// HTTP client for the Paperless REST API
#[derive(Debug, Clone)]
pub struct PaperlessClient {
    base_url: String,
    http: reqwest::Client,
}

impl PaperlessClient {
    /// Create a client from configuration
    ///
    /// Authentication and content negotiation headers are attached to every
    /// request.
    pub fn new(config: &PaperlessConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();

        let mut auth = HeaderValue::from_str(&format!("Token {}", config.token))
            .map_err(|e| ApiError::Config(format!("Invalid token: {}", e)))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let accept = HeaderValue::from_str(&format!(
            "application/json; version={}",
            config.api_version
        ))
        .map_err(|e| ApiError::Config(format!("Invalid accept header: {}", e)))?;
        headers.insert(ACCEPT, accept);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()
            .map_err(|e| ApiError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Base URL requests are made against
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request, turning non-success statuses into `ApiError::Status`
    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response, ApiError> {
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status, body = %body, "{} failed", what);
            return Err(ApiError::Status { status, body });
        }

        Ok(response)
    }
}

impl DocumentApi for PaperlessClient {
    async fn get_document(&self, id: DocumentId) -> Result<Document, ApiError> {
        let url = self.url(&format!("/api/documents/{}/", id));
        let request = self
            .http
            .get(&url)
            .query(&[("fields", "id,content,custom_fields")]);

        let document: Document = self.send(request, "Fetching document").await?.json().await?;
        debug!(doc_id = %id, content_len = document.content().len(), "Fetched document");
        Ok(document)
    }

    async fn update_custom_fields(
        &self,
        id: DocumentId,
        fields: &[CustomFieldValue],
    ) -> Result<(), ApiError> {
        let url = self.url(&format!("/api/documents/{}/", id));
        let request = self.http.patch(&url).json(&CustomFieldsPatch {
            custom_fields: fields,
        });

        self.send(request, "Updating custom fields").await?;
        debug!(doc_id = %id, fields = fields.len(), "Updated custom fields");
        Ok(())
    }

    async fn list_custom_fields(&self) -> Result<Vec<CustomField>, ApiError> {
        let mut fields = Vec::new();
        let mut next = Some(self.url("/api/custom_fields/"));

        while let Some(url) = next.take() {
            let page: Page<CustomField> = self
                .send(self.http.get(&url), "Listing custom fields")
                .await?
                .json()
                .await?;

            fields.extend(page.results);
            // Stop if the server links back to the same page
            next = page.next.filter(|n| *n != url);
        }

        debug!(count = fields.len(), "Listed custom fields");
        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> PaperlessConfig {
        PaperlessConfig {
            url: url.to_string(),
            token: "abc123".to_string(),
            ..PaperlessConfig::default()
        }
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = PaperlessClient::new(&config("http://paperless:8000/")).unwrap();
        assert_eq!(client.base_url(), "http://paperless:8000");
        assert_eq!(
            client.url("/api/custom_fields/"),
            "http://paperless:8000/api/custom_fields/"
        );
    }

    #[test]
    fn test_invalid_token_rejected() {
        let result = PaperlessClient::new(&config_with_token("bad\ntoken"));
        assert!(matches!(result, Err(ApiError::Config(_))));
    }

    fn config_with_token(token: &str) -> PaperlessConfig {
        PaperlessConfig {
            token: token.to_string(),
            ..config("http://paperless:8000")
        }
    }

    #[test]
    fn test_page_parsing() {
        let json = r#"{
            "count": 3,
            "next": "http://paperless:8000/api/custom_fields/?page=2",
            "previous": null,
            "results": [
                {"id": 1, "name": "Amount", "data_type": "monetary"},
                {"id": 2, "name": "Purchase Date", "data_type": "date"}
            ]
        }"#;

        let page: Page<CustomField> = serde_json::from_str(json).unwrap();
        assert_eq!(page.results.len(), 2);
        assert_eq!(page.results[1].id, FieldId::new(2));
        assert!(page.next.is_some());
    }

    #[test]
    fn test_patch_body_shape() {
        let fields = vec![CustomFieldValue::new(FieldId::new(4), "24.19")];
        let body = serde_json::to_value(CustomFieldsPatch {
            custom_fields: &fields,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"custom_fields": [{"field": 4, "value": "24.19"}]})
        );
    }

    #[tokio::test]
    async fn test_connection_error() {
        let client = PaperlessClient::new(&config("http://127.0.0.1:9")).unwrap();
        let result = client.get_document(DocumentId::new(1)).await;
        assert!(matches!(
            result,
            Err(ApiError::Connection(_)) | Err(ApiError::Timeout(_))
        ));
    }
}
