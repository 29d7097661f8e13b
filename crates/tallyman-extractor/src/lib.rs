//! Tallyman Extractor
//!
//! Pulls the total amount and purchase date out of noisy receipt OCR text.
//!
//! # Architecture
//!
//! ```text
//! OCR text → Reducer → Prompt → LLM → Parser → normalize → Extraction
//! ```
//!
//! - **Reducer** keeps the lines likely to hold a total or a date
//! - **Prompt** renders a fixed template with worked examples
//! - **Parser** recovers a JSON object from whatever the model wrote
//! - **Extractor** orchestrates the above and substitutes fallbacks
//!
//! # Example Usage
//!
//! ```no_run
//! use tallyman_domain::DocumentId;
//! use tallyman_extractor::{ExtractionRequest, Extractor, ExtractorConfig};
//! use tallyman_llm::MockProvider;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let llm = MockProvider::new(r#"{"amount": "24.19", "purchase_date": "2025-11-26"}"#);
//! let extractor = Extractor::new(llm, ExtractorConfig::default());
//!
//! let request = ExtractionRequest::new(DocumentId::new(42), "TOTAL $24.19\n11/26/25");
//! let result = extractor.extract(request).await?;
//!
//! println!("{:?}", result.extraction.prediction);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod extractor;
pub mod parser;
pub mod prompt;
pub mod reducer;
mod types;


pub use config::ExtractorConfig;
pub use error::ExtractorError;
pub use extractor::Extractor;
pub use parser::{parse_response, ParsedResponse, Recovery};
pub use reducer::TextReducer;
pub use types::{ExtractionMetadata, ExtractionRequest, ExtractionResult};
