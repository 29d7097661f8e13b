//! Core Extractor implementation

use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::parser::{parse_response, Recovery};
use crate::prompt::{PromptBuilder, SYSTEM_PROMPT};
use crate::reducer::TextReducer;
use crate::types::{ExtractionMetadata, ExtractionRequest, ExtractionResult};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tallyman_domain::traits::{GenerationRequest, LlmProvider};
use tallyman_domain::{
    normalize_amount, normalize_date, null_to_none, value_text, Extraction, Prediction,
};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Key the model is asked to put the total under
const AMOUNT_KEY: &str = "amount";

/// Key the model is asked to put the purchase date under
const DATE_KEY: &str = "purchase_date";

/// The Extractor turns OCR text into a normalized amount and purchase date
pub struct Extractor<L>
where
    L: LlmProvider,
{
    llm_provider: Arc<L>,
    reducer: TextReducer,
    config: ExtractorConfig,
    model_name: String,
}

impl<L> Extractor<L>
where
    L: LlmProvider + Send + Sync + 'static,
    L::Error: std::fmt::Display,
{
    /// Create a new Extractor owning its provider
    pub fn new(llm_provider: L, config: ExtractorConfig) -> Self {
        Self::from_shared(Arc::new(llm_provider), config)
    }

    /// Create a new Extractor over a provider shared with other components
    pub fn from_shared(llm_provider: Arc<L>, config: ExtractorConfig) -> Self {
        let model_name = llm_provider.model_name().to_string();
        Self {
            llm_provider,
            reducer: config.reducer(),
            config,
            model_name,
        }
    }

    /// Name of the model answering extraction requests
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Extract the amount and purchase date from OCR text
    ///
    /// Blank input, or input that is nothing but noise, yields both fields
    /// unknown without calling the model. Otherwise the result always carries
    /// values: anything the model did not supply becomes a fallback.
    pub async fn extract(
        &self,
        request: ExtractionRequest,
    ) -> Result<ExtractionResult, ExtractorError> {
        let start = Instant::now();
        let input_len = request.text.len();

        if request.text.trim().is_empty() {
            debug!(doc_id = %request.doc_id, "Empty OCR text, skipping model");
            return Ok(self.finish(request, Extraction::no_text(), 0, None, false, start));
        }

        let reduced = self.reducer.reduce(&request.text);
        if reduced.trim().is_empty() {
            debug!(doc_id = %request.doc_id, "Nothing left after reduction, skipping model");
            return Ok(self.finish(request, Extraction::no_text(), 0, None, false, start));
        }

        info!(
            doc_id = %request.doc_id,
            input_len,
            reduced_len = reduced.len(),
            "Starting extraction"
        );

        let prompt = PromptBuilder::new(reduced.as_str()).build();
        debug!(doc_id = %request.doc_id, prompt = %prompt, "Rendered prompt");

        let generation = GenerationRequest::new(prompt)
            .with_system(SYSTEM_PROMPT)
            .with_max_tokens(self.config.max_tokens)
            .with_json_output();

        let response = timeout(self.config.extraction_timeout(), self.call_llm(generation))
            .await
            .map_err(|_| ExtractorError::Timeout(self.config.extraction_timeout_secs))??;

        debug!(doc_id = %request.doc_id, response = %response, "Model response");

        let parsed = parse_response(&response);
        let extraction = interpret(&parsed.fields);

        Ok(self.finish(
            request,
            extraction,
            reduced.len(),
            parsed.recovered_by,
            true,
            start,
        ))
    }

    fn finish(
        &self,
        request: ExtractionRequest,
        extraction: Extraction,
        reduced_len: usize,
        recovered_by: Option<Recovery>,
        model_called: bool,
        start: Instant,
    ) -> ExtractionResult {
        let processing_time_ms = start.elapsed().as_millis() as u64;

        if model_called {
            info!(
                doc_id = %request.doc_id,
                amount = ?extraction.prediction.amount,
                purchase_date = ?extraction.prediction.purchase_date,
                amount_origin = ?extraction.amount_origin,
                date_origin = ?extraction.date_origin,
                processing_time_ms,
                "Extraction complete"
            );
        }

        ExtractionResult {
            extraction,
            metadata: ExtractionMetadata {
                doc_id: request.doc_id,
                model_name: self.model_name.clone(),
                model_called,
                input_len: request.text.len(),
                reduced_len,
                recovered_by,
                processing_time_ms,
            },
        }
    }

    /// Call the LLM provider
    async fn call_llm(&self, request: GenerationRequest) -> Result<String, ExtractorError> {
        let llm = Arc::clone(&self.llm_provider);

        // LlmProvider is synchronous
        tokio::task::spawn_blocking(move || {
            llm.generate(&request)
                .map_err(|e| ExtractorError::Llm(e.to_string()))
        })
        .await
        .map_err(|e| ExtractorError::Llm(format!("Task join error: {}", e)))?
    }
}

/// Turn recovered model fields into a normalized extraction with fallbacks
fn interpret(fields: &Map<String, Value>) -> Extraction {
    let raw_amount = null_to_none(fields.get(AMOUNT_KEY)).and_then(value_text);
    let raw_purchase_date = null_to_none(fields.get(DATE_KEY)).and_then(value_text);

    let prediction = Prediction {
        amount: raw_amount.as_deref().and_then(normalize_amount),
        purchase_date: raw_purchase_date.as_deref().and_then(normalize_date),
    };

    if raw_amount.is_some() && prediction.amount.is_none() {
        warn!(raw = ?raw_amount, "Model amount could not be normalized");
    }
    if raw_purchase_date.is_some() && prediction.purchase_date.is_none() {
        warn!(raw = ?raw_purchase_date, "Model purchase date could not be normalized");
    }

    let (amount, amount_origin) = prediction.amount_or_fallback();
    let (purchase_date, date_origin) = prediction.purchase_date_or_fallback();

    Extraction {
        prediction: Prediction {
            amount: Some(amount),
            purchase_date: Some(purchase_date),
        },
        amount_origin,
        date_origin,
        raw_amount,
        raw_purchase_date,
    }
}
