//! Ollama Provider Implementation
//!
//! Talks to a local Ollama runtime over its chat API.
//!
//! # Features
//!
//! - Chat completion with optional system message
//! - JSON-constrained output (`format: "json"`)
//! - Deterministic decoding options and an output-length cap
//! - Model availability check on load
//! - Fixed request timeout, no retries
//!
//! # Examples
//!
//! ```no_run
//! use tallyman_llm::OllamaProvider;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let provider = OllamaProvider::new("http://localhost:11434", "llama3.2")
//!     .unwrap()
//!     .with_threads(Some(4));
//! # }
//! ```

use crate::LlmError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tallyman_domain::traits::{GenerationRequest, LlmProvider};
use tokio::runtime::Handle;
use tracing::{debug, warn};

/// Default Ollama API endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default timeout for LLM requests
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default context window
pub const DEFAULT_CONTEXT_WINDOW: u32 = 2048;

/// Ollama API provider for local LLM inference
///
/// The trait methods are blocking; call them from a blocking context such as
/// `tokio::task::spawn_blocking`. The provider drives its async HTTP client on
/// the runtime it was created in.
pub struct OllamaProvider {
    endpoint: String,
    model: String,
    client: reqwest::Client,
    runtime: Handle,
    timeout_secs: u64,
    context_window: u32,
    threads: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
    num_ctx: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_thread: Option<u32>,
}

/// Request body for Ollama chat API
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
    options: ChatOptions,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Response from Ollama chat API
#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct TagsResponse {
    models: Vec<TagsModel>,
}

#[derive(Deserialize)]
struct TagsModel {
    name: String,
}

impl OllamaProvider {
    /// Create a new Ollama provider
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Parameters
    ///
    /// - `endpoint`: Ollama API endpoint (e.g., "http://localhost:11434")
    /// - `model`: Model to use (e.g., "llama3.2", "qwen2.5:3b")
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        Self::with_timeout(endpoint, model, DEFAULT_TIMEOUT_SECS)
    }

    /// Create a new Ollama provider with a specific request timeout
    pub fn with_timeout(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, LlmError> {
        let runtime = Handle::try_current()
            .map_err(|e| LlmError::Other(format!("No async runtime available: {}", e)))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LlmError::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client,
            runtime,
            timeout_secs,
            context_window: DEFAULT_CONTEXT_WINDOW,
            threads: None,
        })
    }

    /// Set the thread hint passed to the runtime
    pub fn with_threads(mut self, threads: Option<u32>) -> Self {
        self.threads = threads;
        self
    }

    /// Set the context window size
    pub fn with_context_window(mut self, context_window: u32) -> Self {
        self.context_window = context_window;
        self
    }

    /// Generate a chat completion
    pub async fn chat(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        let url = format!("{}/api/chat", self.endpoint);

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        let body = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
            format: request.json_output.then_some("json"),
            options: ChatOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
                num_ctx: self.context_window,
                num_thread: self.threads,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LlmError::ModelNotAvailable(self.model.clone()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), %body, "Ollama chat request failed");
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        debug!(len = parsed.message.content.len(), "Ollama chat response received");
        Ok(parsed.message.content)
    }

    /// List the models the runtime has available
    pub async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let url = format!("{}/api/tags", self.endpoint);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TagsResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse model list: {}", e)))?;

        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }

    fn transport_error(&self, e: reqwest::Error) -> LlmError {
        if e.is_timeout() {
            LlmError::Timeout(self.timeout_secs)
        } else {
            LlmError::Communication(format!("Request to {} failed: {}", self.endpoint, e))
        }
    }
}

/// Whether an installed model name satisfies the configured one
///
/// `llama3` matches `llama3:latest`; a tagged name must match exactly.
fn model_matches(installed: &str, wanted: &str) -> bool {
    if installed == wanted {
        return true;
    }
    match installed.split_once(':') {
        Some((base, tag)) => !wanted.contains(':') && base == wanted && tag == "latest",
        None => false,
    }
}

impl LlmProvider for OllamaProvider {
    type Error = LlmError;

    fn load(&self) -> Result<(), Self::Error> {
        let models = self.runtime.block_on(self.list_models())?;
        if models.iter().any(|m| model_matches(m, &self.model)) {
            Ok(())
        } else {
            Err(LlmError::ModelNotAvailable(format!(
                "{} (installed: {})",
                self.model,
                models.join(", ")
            )))
        }
    }

    fn generate(&self, request: &GenerationRequest) -> Result<String, Self::Error> {
        self.runtime.block_on(self.chat(request))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ollama_provider_creation() {
        let provider = OllamaProvider::new("http://localhost:11434/", "llama3.2").unwrap();
        assert_eq!(provider.endpoint, "http://localhost:11434");
        assert_eq!(provider.model, "llama3.2");
        assert_eq!(provider.context_window, DEFAULT_CONTEXT_WINDOW);
        assert_eq!(provider.threads, None);
    }

    #[tokio::test]
    async fn test_ollama_provider_builders() {
        let provider = OllamaProvider::with_timeout(DEFAULT_ENDPOINT, "mistral", 5)
            .unwrap()
            .with_threads(Some(4))
            .with_context_window(4096);
        assert_eq!(provider.timeout_secs, 5);
        assert_eq!(provider.threads, Some(4));
        assert_eq!(provider.context_window, 4096);
    }

    #[test]
    fn test_creation_outside_runtime_fails() {
        assert!(matches!(
            OllamaProvider::new(DEFAULT_ENDPOINT, "llama3.2"),
            Err(LlmError::Other(_))
        ));
    }

    #[test]
    fn test_chat_request_shape() {
        let body = ChatRequest {
            model: "llama3.2",
            messages: vec![
                ChatMessage { role: "system", content: "be strict" },
                ChatMessage { role: "user", content: "hi" },
            ],
            stream: false,
            format: Some("json"),
            options: ChatOptions {
                temperature: 0.0,
                num_predict: 128,
                num_ctx: 2048,
                num_thread: None,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["format"], "json");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_predict"], 128);
        assert_eq!(json["messages"][0]["role"], "system");
        assert!(json["options"].get("num_thread").is_none());
    }

    #[test]
    fn test_model_matches() {
        assert!(model_matches("llama3.2:latest", "llama3.2"));
        assert!(model_matches("qwen2.5:3b", "qwen2.5:3b"));
        assert!(!model_matches("qwen2.5:3b", "qwen2.5"));
        assert!(!model_matches("llama3.2:latest", "llama3"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_ollama_error_handling() {
        // Nothing listens on this port
        let provider = OllamaProvider::with_timeout("http://127.0.0.1:9", "llama3.2", 2).unwrap();

        let result = tokio::task::spawn_blocking(move || {
            provider.generate(&GenerationRequest::new("test"))
        })
        .await
        .unwrap();

        assert!(matches!(
            result,
            Err(LlmError::Communication(_)) | Err(LlmError::Timeout(_))
        ));
    }
}
