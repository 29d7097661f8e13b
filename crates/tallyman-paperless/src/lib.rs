//! Tallyman Paperless client
//!
//! Client library for the Paperless document API: fetching OCR content,
//! listing custom fields, and writing predicted values back.
//!
//! # Example
//!
//! ```no_run
//! use tallyman_domain::DocumentId;
//! use tallyman_paperless::{DocumentApi, PaperlessClient, PaperlessConfig};
//!
//! # async fn example() -> Result<(), tallyman_paperless::ApiError> {
//! let config = PaperlessConfig {
//!     url: "http://paperless:8000".to_string(),
//!     token: "0123456789abcdef".to_string(),
//!     ..PaperlessConfig::default()
//! };
//! let client = PaperlessClient::new(&config)?;
//!
//! let document = client.get_document(DocumentId::new(42)).await?;
//! println!("{} chars of OCR text", document.content().len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod client;
mod config;
mod error;
mod fields;

pub use client::{CustomField, DocumentApi, PaperlessClient};
pub use config::{FieldsConfig, PaperlessConfig, DEFAULT_API_VERSION};
pub use error::ApiError;
pub use fields::{apply_prediction, resolve_field_ids, FieldResolveError, RetryPolicy};
