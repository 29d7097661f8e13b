//! Tallyman Domain Layer
//!
//! Core vocabulary for receipt-field extraction: documents and their custom
//! fields, predictions and the records that persist them, value
//! normalization, and the trait seams that infrastructure crates implement.
//!
//! ## Key Concepts
//!
//! - **Document**: an OCR'd document with an ordered list of custom field values
//! - **FieldIdMap**: custom-field names resolved to numeric IDs, once per process
//! - **Prediction**: the normalized `{amount, purchase_date}` pair
//! - **PredictionRecord**: a prediction persisted by document ID for later correlation
//!
//! ## Architecture
//!
//! This crate performs no I/O. Model runtimes, storage and the document
//! system's HTTP API live in other crates behind the traits in [`traits`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod document;
pub mod normalize;
pub mod prediction;
pub mod traits;

// Re-exports for convenience
pub use document::{CustomFieldValue, Document, DocumentId, FieldId, FieldIdMap, ReceiptFields};
pub use normalize::{normalize_amount, normalize_date, null_to_none, value_text};
pub use prediction::{
    Extraction, FieldComparison, FieldOrigin, Prediction, PredictionRecord, Reconciliation,
    AMOUNT_SENTINEL, DATE_SENTINEL,
};
