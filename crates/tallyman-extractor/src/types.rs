//! Request and response types for extraction

use crate::parser::Recovery;
use tallyman_domain::{DocumentId, Extraction};

/// Request to extract receipt fields from OCR text
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    /// Document the text belongs to (used for logging)
    pub doc_id: DocumentId,

    /// Raw OCR text
    pub text: String,
}

impl ExtractionRequest {
    /// Create a request
    pub fn new(doc_id: DocumentId, text: impl Into<String>) -> Self {
        Self {
            doc_id,
            text: text.into(),
        }
    }
}

/// Result of an extraction operation
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    /// Normalized values and their provenance
    pub extraction: Extraction,

    /// Metadata about the extraction
    pub metadata: ExtractionMetadata,
}

/// Metadata about an extraction operation
#[derive(Debug, Clone)]
pub struct ExtractionMetadata {
    /// Document the extraction ran for
    pub doc_id: DocumentId,

    /// Name of the LLM model used
    pub model_name: String,

    /// Whether the model was called
    pub model_called: bool,

    /// Length of the OCR text received
    pub input_len: usize,

    /// Length of the text after reduction
    pub reduced_len: usize,

    /// Parse strategy that recovered the response, if any
    pub recovered_by: Option<Recovery>,

    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}
