//! Tallyman LLM Provider Layer
//!
//! Implementations of the `LlmProvider` trait from `tallyman-domain`, plus the
//! process-wide [`ModelHandle`] that owns the loaded model.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic mock for testing
//! - `OllamaProvider`: Local Ollama chat API integration
//!
//! # Examples
//!
//! ```
//! use tallyman_llm::{MockProvider, ModelHandle};
//! use tallyman_domain::traits::GenerationRequest;
//!
//! let handle = ModelHandle::load(MockProvider::new(r#"{"amount": "1.00"}"#)).unwrap();
//! let result = handle.generate(&GenerationRequest::new("test prompt")).unwrap();
//! assert_eq!(result, r#"{"amount": "1.00"}"#);
//! ```

#![warn(missing_docs)]

pub mod handle;
pub mod ollama;

use std::sync::{Arc, Mutex, PoisonError};
use tallyman_domain::traits::{GenerationRequest, LlmProvider};
use thiserror::Error;

pub use handle::ModelHandle;
pub use ollama::OllamaProvider;

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Request exceeded the client timeout
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    /// Runtime answered with a non-success status
    #[error("Model runtime returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

#[derive(Debug, Clone)]
enum MockReply {
    Text(String),
    Fail,
}

#[derive(Debug, Default)]
struct MockState {
    replies: Vec<(String, MockReply)>,
    calls: usize,
    loads: usize,
    last_request: Option<GenerationRequest>,
}

/// Mock LLM provider for deterministic testing
///
/// Returns pre-configured responses without making any network calls. A
/// response registered with [`add_response`](Self::add_response) is used
/// whenever the prompt contains its pattern; otherwise the default response
/// is returned.
///
/// # Examples
///
/// ```
/// use tallyman_llm::MockProvider;
/// use tallyman_domain::traits::{GenerationRequest, LlmProvider};
///
/// let mut provider = MockProvider::new("{}");
/// provider.add_response("Total: $5", r#"{"amount": "5.00"}"#);
/// let reply = provider.generate(&GenerationRequest::new("... Total: $5 ...")).unwrap();
/// assert_eq!(reply, r#"{"amount": "5.00"}"#);
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    model_name: String,
    state: Arc<Mutex<MockState>>,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            model_name: "mock".to_string(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Answer prompts containing `pattern` with `response`
    pub fn add_response(&mut self, pattern: impl Into<String>, response: impl Into<String>) {
        self.state()
            .replies
            .push((pattern.into(), MockReply::Text(response.into())));
    }

    /// Fail prompts containing `pattern`
    pub fn add_error(&mut self, pattern: impl Into<String>) {
        self.state().replies.push((pattern.into(), MockReply::Fail));
    }

    /// Get the number of times generate was called
    pub fn call_count(&self) -> usize {
        self.state().calls
    }

    /// Get the number of times load was called
    pub fn load_count(&self) -> usize {
        self.state().loads
    }

    /// The most recent request seen by generate
    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.state().last_request.clone()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("{}")
    }
}

impl LlmProvider for MockProvider {
    type Error = LlmError;

    fn load(&self) -> Result<(), Self::Error> {
        self.state().loads += 1;
        Ok(())
    }

    fn generate(&self, request: &GenerationRequest) -> Result<String, Self::Error> {
        let mut state = self.state();
        state.calls += 1;
        state.last_request = Some(request.clone());

        let reply = state
            .replies
            .iter()
            .find(|(pattern, _)| request.prompt.contains(pattern.as_str()))
            .map(|(_, reply)| reply.clone());

        match reply {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Fail) => Err(LlmError::Other("Mock error".to_string())),
            None => Ok(self.default_response.clone()),
        }
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
