//! Configuration management for the CLI.
//!
//! Shares the `[paperless]`, `[store]` and `[fields]` sections with the
//! server config file; values from flags or the environment win.

use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tallyman_paperless::{FieldsConfig, PaperlessConfig};

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Document API connection
    pub paperless: PaperlessConfig,

    /// Prediction cache location
    pub store: StoreSettings,

    /// Custom field names
    pub fields: FieldsConfig,

    /// Base URL of the extraction endpoint
    pub helper_url: String,

    /// Timeout for one extraction call (seconds)
    pub helper_timeout_secs: u64,

    /// Display settings
    pub settings: Settings,
}

/// Prediction cache location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Directory holding one record per document
    pub dir: PathBuf,
}

/// Global CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
    /// Quiet (minimal) format
    Quiet,
}

/// Values taken from flags or the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// `PAPERLESS_API_URL`
    pub paperless_url: Option<String>,
    /// `PAPERLESS_API_KEY`
    pub paperless_token: Option<String>,
    /// `HELPER_URL`
    pub helper_url: Option<String>,
    /// `TALLYMAN_PRED_DIR`
    pub store_dir: Option<PathBuf>,
}

impl Config {
    /// Default configuration file path.
    pub fn path() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| CliError::Config("Could not find config directory".into()))?;
        Ok(dir.join("tallyman").join("config.toml"))
    }

    /// Load configuration from `path`, or from the default path.
    ///
    /// An explicit path must exist. A missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_toml(&fs::read_to_string(path)?),
            None => {
                let path = Self::path()?;
                if path.exists() {
                    Self::from_toml(&fs::read_to_string(&path)?)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Apply flag / environment overrides.
    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(url) = overrides.paperless_url {
            self.paperless.url = url;
        }
        if let Some(token) = overrides.paperless_token {
            self.paperless.token = token;
        }
        if let Some(url) = overrides.helper_url {
            self.helper_url = url;
        }
        if let Some(dir) = overrides.store_dir {
            self.store.dir = dir;
        }
    }

    /// Extraction call timeout.
    pub fn helper_timeout(&self) -> Duration {
        Duration::from_secs(self.helper_timeout_secs)
    }

    /// Check the settings needed to talk to the document API.
    pub fn validate_paperless(&self) -> Result<()> {
        self.paperless.validate().map_err(CliError::Config)?;
        self.fields.validate().map_err(CliError::Config)
    }

    /// Check the settings needed by `consume`.
    pub fn validate_consume(&self) -> Result<()> {
        self.validate_paperless()?;
        if self.helper_url.trim().is_empty() {
            return Err(CliError::Config("helper_url must be set".to_string()));
        }
        if self.helper_timeout_secs == 0 {
            return Err(CliError::Config(
                "helper_timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paperless: PaperlessConfig::default(),
            store: StoreSettings::default(),
            fields: FieldsConfig::default(),
            helper_url: "http://localhost:8080".to_string(),
            helper_timeout_secs: 30,
            settings: Settings::default(),
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("/pred_cache"),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}
