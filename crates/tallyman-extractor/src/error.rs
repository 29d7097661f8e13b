//! Error types for the Extractor

use thiserror::Error;

/// Errors that can occur during extraction
///
/// An unparseable model answer is not an error: it degrades to fallback
/// values. Only failing to get an answer at all is.
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// LLM provider error
    #[error("LLM error: {0}")]
    Llm(String),

    /// The model did not answer in time
    #[error("Extraction timeout after {0}s")]
    Timeout(u64),
}
