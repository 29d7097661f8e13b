//! Error types for the CLI application.

use tallyman_domain::DocumentId;
use tallyman_paperless::{ApiError, FieldResolveError};
use tallyman_store::StoreError;
use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Document API error
    #[error("Document API error: {0}")]
    Api(#[from] ApiError),

    /// Custom fields could not be resolved
    #[error("Field resolution failed: {0}")]
    Fields(#[from] FieldResolveError),

    /// Extraction endpoint error
    #[error("Extraction endpoint error: {0}")]
    Helper(String),

    /// Prediction store error
    #[error("Prediction store error: {0}")]
    Store(#[from] StoreError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// No stored prediction for a document
    #[error("No prediction stored for document {0}")]
    NotFound(DocumentId),
}
