//! Connection and field settings shared by the server and the CLI

use crate::fields::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default API version sent in the `Accept` header
pub const DEFAULT_API_VERSION: u32 = 6;

/// How to reach the document API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperlessConfig {
    /// Base URL, e.g. `http://paperless:8000`
    pub url: String,

    /// API token
    pub token: String,

    /// Per-request timeout (seconds)
    pub timeout_secs: u64,

    /// Version requested through content negotiation
    pub api_version: u32,
}

impl Default for PaperlessConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            token: String::new(),
            timeout_secs: 10,
            api_version: DEFAULT_API_VERSION,
        }
    }
}

impl PaperlessConfig {
    /// Request timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.url.trim().is_empty() {
            return Err("paperless.url must be set".to_string());
        }
        if self.token.trim().is_empty() {
            return Err("paperless.token must be set".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("paperless.timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Names of the custom fields predictions are written to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldsConfig {
    /// Name of the amount field
    pub amount: String,

    /// Name of the purchase date field
    pub purchase_date: String,

    /// Attempts at listing fields before giving up
    pub max_attempts: u32,

    /// Pause between attempts (seconds)
    pub retry_delay_secs: u64,
}

impl Default for FieldsConfig {
    fn default() -> Self {
        Self {
            amount: "Amount".to_string(),
            purchase_date: "Purchase Date".to_string(),
            max_attempts: 10,
            retry_delay_secs: 2,
        }
    }
}

impl FieldsConfig {
    /// Field names that must resolve at startup
    pub fn names(&self) -> [&str; 2] {
        [self.amount.as_str(), self.purchase_date.as_str()]
    }

    /// Retry policy for field resolution
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            delay: Duration::from_secs(self.retry_delay_secs),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.amount.trim().is_empty() || self.purchase_date.trim().is_empty() {
            return Err("field names must not be empty".to_string());
        }
        if self.amount == self.purchase_date {
            return Err("amount and purchase_date must name different fields".to_string());
        }
        if self.max_attempts == 0 {
            return Err("fields.max_attempts must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let paperless = PaperlessConfig::default();
        assert_eq!(paperless.timeout_secs, 10);
        assert_eq!(paperless.api_version, 6);
        assert!(paperless.validate().is_err());

        let fields = FieldsConfig::default();
        assert_eq!(fields.names(), ["Amount", "Purchase Date"]);
        assert_eq!(fields.retry_policy().max_attempts, 10);
        assert_eq!(fields.retry_policy().delay, Duration::from_secs(2));
        assert!(fields.validate().is_ok());
    }

    #[test]
    fn test_validate_paperless() {
        let config = PaperlessConfig {
            url: "http://paperless:8000".to_string(),
            token: "secret".to_string(),
            ..PaperlessConfig::default()
        };
        assert!(config.validate().is_ok());

        let no_token = PaperlessConfig {
            token: " ".to_string(),
            ..config.clone()
        };
        assert!(no_token.validate().is_err());

        let no_timeout = PaperlessConfig {
            timeout_secs: 0,
            ..config
        };
        assert!(no_timeout.validate().is_err());
    }

    #[test]
    fn test_validate_fields() {
        let same = FieldsConfig {
            purchase_date: "Amount".to_string(),
            ..FieldsConfig::default()
        };
        assert!(same.validate().is_err());
    }
}
