//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and infrastructure.
//! Infrastructure implementations live in other crates.

use crate::{DocumentId, PredictionRecord};

/// Default cap on generated tokens for a single extraction
pub const DEFAULT_MAX_TOKENS: u32 = 128;

/// One text-generation call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Optional system message
    pub system: Option<String>,

    /// User prompt
    pub prompt: String,

    /// Sampling temperature; 0 means deterministic decoding
    pub temperature: f32,

    /// Upper bound on generated tokens
    pub max_tokens: u32,

    /// Ask the runtime to constrain output to a JSON object
    pub json_output: bool,
}

impl GenerationRequest {
    /// Deterministic request with the default output cap
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            temperature: 0.0,
            max_tokens: DEFAULT_MAX_TOKENS,
            json_output: false,
        }
    }

    /// Set the system message
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the output cap
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Request JSON-constrained output
    pub fn with_json_output(mut self) -> Self {
        self.json_output = true;
        self
    }
}

/// Trait for LLM provider operations
///
/// Implemented by the infrastructure layer (tallyman-llm)
pub trait LlmProvider {
    /// Error type for LLM operations
    type Error;

    /// Prepare the model for inference
    ///
    /// Called once at startup. Providers with nothing to prepare keep the default.
    fn load(&self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Generate a completion
    fn generate(&self, request: &GenerationRequest) -> Result<String, Self::Error>;

    /// Name of the model behind this provider
    fn model_name(&self) -> &str;
}

/// Trait for persisting predictions by document ID
///
/// Implemented by the infrastructure layer (tallyman-store). Writes for the
/// same document are last-write-wins.
pub trait PredictionStore {
    /// Error type for store operations
    type Error;

    /// Write (or overwrite) the record for `record.doc_id`
    fn store(&self, record: &PredictionRecord) -> Result<(), Self::Error>;

    /// Read the record for a document, `None` if nothing was stored
    fn load(&self, doc_id: DocumentId) -> Result<Option<PredictionRecord>, Self::Error>;
}
