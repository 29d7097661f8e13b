//! Process-wide owner of the loaded model
//!
//! The model is loaded exactly once, when the handle is built at startup, and
//! decoding sessions are not assumed to be shareable: every generation call
//! takes the handle's lock, so concurrent requests are served one at a time.

use std::sync::{Mutex, PoisonError};
use tallyman_domain::traits::{GenerationRequest, LlmProvider};
use tracing::{debug, info};

/// Single long-lived handle to a loaded model
pub struct ModelHandle<L> {
    provider: Mutex<L>,
    model_name: String,
}

impl<L: LlmProvider> ModelHandle<L> {
    /// Load the model behind `provider` and take ownership of it
    pub fn load(provider: L) -> Result<Self, L::Error> {
        let model_name = provider.model_name().to_string();
        info!(model = %model_name, "Loading model");
        provider.load()?;
        info!(model = %model_name, "Model ready");

        Ok(Self {
            provider: Mutex::new(provider),
            model_name,
        })
    }

    /// Run one generation, waiting for any in-flight generation to finish first
    pub fn generate(&self, request: &GenerationRequest) -> Result<String, L::Error> {
        let provider = self.provider.lock().unwrap_or_else(PoisonError::into_inner);
        debug!(
            model = %self.model_name,
            prompt_len = request.prompt.len(),
            "Generating"
        );
        provider.generate(request)
    }

    /// Name of the loaded model
    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

impl<L: LlmProvider> LlmProvider for ModelHandle<L> {
    type Error = L::Error;

    fn generate(&self, request: &GenerationRequest) -> Result<String, Self::Error> {
        ModelHandle::generate(self, request)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
