//! Configuration file parsing for the server.
//!
//! Settings come from an optional TOML file, then environment overrides are
//! applied on top. Everything is validated before the server starts.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tallyman_extractor::ExtractorConfig;
use tallyman_paperless::{FieldsConfig, PaperlessConfig};
use thiserror::Error;

/// Server configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Missing required field
    #[error("Missing required configuration field: {0}")]
    MissingField(String),

    /// Field present but unusable
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Server configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub bind_address: String,

    /// Bind port (e.g., 8080)
    pub bind_port: u16,

    /// Document API connection
    pub paperless: PaperlessConfig,

    /// Model runtime
    pub llm: LlmConfig,

    /// Prediction cache
    pub store: StoreConfig,

    /// Custom field names
    pub fields: FieldsConfig,
}

/// Model runtime settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Runtime endpoint
    pub endpoint: String,

    /// Model name
    pub model: String,

    /// Thread hint for decoding
    pub threads: Option<u32>,

    /// Per-call timeout (seconds)
    pub timeout_secs: u64,

    /// Cap on generated tokens
    pub max_tokens: u32,

    /// Context window size
    pub context_window: u32,
}

/// Prediction cache settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding one record per document
    pub dir: PathBuf,

    /// Delete records older than this (seconds); unset keeps them forever
    pub max_age_secs: Option<u64>,
}

/// Values taken from the command line or environment
///
/// Any `Some` replaces what the file said.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// `PAPERLESS_API_URL`
    pub paperless_url: Option<String>,
    /// `PAPERLESS_API_KEY`
    pub paperless_token: Option<String>,
    /// `LLM_ENDPOINT`
    pub llm_endpoint: Option<String>,
    /// `LLM_MODEL`
    pub llm_model: Option<String>,
    /// `LLM_N_THREADS`
    pub llm_threads: Option<u32>,
    /// `TALLYMAN_PRED_DIR`
    pub store_dir: Option<PathBuf>,
    /// `TALLYMAN_BIND`, as `address:port`
    pub bind: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            bind_port: 8080,
            paperless: PaperlessConfig::default(),
            llm: LlmConfig::default(),
            store: StoreConfig::default(),
            fields: FieldsConfig::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: tallyman_llm::ollama::DEFAULT_ENDPOINT.to_string(),
            model: String::new(),
            threads: None,
            timeout_secs: tallyman_llm::ollama::DEFAULT_TIMEOUT_SECS,
            max_tokens: 128,
            context_window: tallyman_llm::ollama::DEFAULT_CONTEXT_WINDOW,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("/pred_cache"),
            max_age_secs: None,
        }
    }
}

impl StoreConfig {
    /// Retention age, if configured
    pub fn max_age(&self) -> Option<Duration> {
        self.max_age_secs.map(Duration::from_secs)
    }
}

impl LlmConfig {
    /// Extraction settings derived from the model settings
    pub fn extractor_config(&self) -> ExtractorConfig {
        ExtractorConfig {
            max_tokens: self.max_tokens,
            extraction_timeout_secs: self.timeout_secs,
            ..ExtractorConfig::default()
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Apply command line / environment overrides
    pub fn apply_overrides(&mut self, overrides: Overrides) -> Result<(), ConfigError> {
        if let Some(url) = overrides.paperless_url {
            self.paperless.url = url;
        }
        if let Some(token) = overrides.paperless_token {
            self.paperless.token = token;
        }
        if let Some(endpoint) = overrides.llm_endpoint {
            self.llm.endpoint = endpoint;
        }
        if let Some(model) = overrides.llm_model {
            self.llm.model = model;
        }
        if let Some(threads) = overrides.llm_threads {
            self.llm.threads = Some(threads);
        }
        if let Some(dir) = overrides.store_dir {
            self.store.dir = dir;
        }
        if let Some(bind) = overrides.bind {
            let (address, port) = bind
                .rsplit_once(':')
                .ok_or_else(|| ConfigError::Invalid(format!("bind '{}' is not address:port", bind)))?;
            self.bind_port = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("bind port '{}' is not a port", port)))?;
            self.bind_address = address.to_string();
        }
        Ok(())
    }

    /// Check that everything needed at startup is present
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.paperless.url.trim().is_empty() {
            return Err(ConfigError::MissingField("paperless.url".to_string()));
        }
        if self.paperless.token.trim().is_empty() {
            return Err(ConfigError::MissingField("paperless.token".to_string()));
        }
        if self.llm.endpoint.trim().is_empty() {
            return Err(ConfigError::MissingField("llm.endpoint".to_string()));
        }
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::MissingField("llm.model".to_string()));
        }
        if self.llm.threads == Some(0) {
            return Err(ConfigError::Invalid("llm.threads must be greater than 0".to_string()));
        }
        if self.store.max_age_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "store.max_age_secs must be greater than 0".to_string(),
            ));
        }

        self.paperless.validate().map_err(ConfigError::Invalid)?;
        self.fields.validate().map_err(ConfigError::Invalid)?;
        self.llm.extractor_config().validate().map_err(ConfigError::Invalid)?;
        Ok(())
    }

    /// Get the full bind address (address:port)
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.bind_port)
    }
}
