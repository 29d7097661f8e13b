//! Error types for the Paperless client.

use thiserror::Error;

/// Document API errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// The API answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Status {
        /// Response status code
        status: u16,
        /// Response body, as text
        body: String,
    },

    /// Connection error (network, DNS, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// The API did not answer in time
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// The response body was not what the API documents
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Client could not be configured
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout(e.to_string())
        } else if e.is_connect() {
            ApiError::Connection(e.to_string())
        } else if e.is_decode() {
            ApiError::InvalidResponse(e.to_string())
        } else if let Some(status) = e.status() {
            ApiError::Status {
                status: status.as_u16(),
                body: e.to_string(),
            }
        } else {
            ApiError::Connection(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::InvalidResponse(format!("JSON parsing error: {}", e))
    }
}
