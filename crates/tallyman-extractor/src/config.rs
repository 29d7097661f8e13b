//! Configuration for the Extractor

use crate::reducer::{TextReducer, DEFAULT_MIN_LINES, DEFAULT_SHORT_LINE_CHARS};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tallyman_domain::traits::DEFAULT_MAX_TOKENS;

/// Configuration for the Extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Cap on generated tokens per model call
    pub max_tokens: u32,

    /// Maximum time for a single model call (seconds)
    pub extraction_timeout_secs: u64,

    /// Inputs with at most this many non-noise lines skip reduction
    pub reduce_min_lines: usize,

    /// Lines up to this many characters survive reduction without digits
    pub reduce_short_line_chars: usize,
}

impl ExtractorConfig {
    /// Get the extraction timeout as a Duration
    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction_timeout_secs)
    }

    /// Reducer configured with these thresholds
    pub fn reducer(&self) -> TextReducer {
        TextReducer::new(self.reduce_min_lines, self.reduce_short_line_chars)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_tokens == 0 {
            return Err("max_tokens must be greater than 0".to_string());
        }
        if self.extraction_timeout_secs == 0 {
            return Err("extraction_timeout_secs must be greater than 0".to_string());
        }
        if self.reduce_short_line_chars == 0 {
            return Err("reduce_short_line_chars must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            extraction_timeout_secs: 120,
            reduce_min_lines: DEFAULT_MIN_LINES,
            reduce_short_line_chars: DEFAULT_SHORT_LINE_CHARS,
        }
    }
}
