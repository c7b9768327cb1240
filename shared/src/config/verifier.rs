//! Token broker configuration

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Placeholder hash key shipped for local development only
pub const DEVELOPMENT_HASH_KEY: &str = "development-hash-key-change-in-production";

/// Smallest accepted token length
pub const MIN_TOKEN_LENGTH: usize = 4;

/// Largest accepted token length
pub const MAX_TOKEN_LENGTH: usize = 12;

/// Longest accepted token lifetime or resend window, one day
pub const MAX_WINDOW_SECS: u64 = 86_400;

/// Characters a generated token is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenCharset {
    /// Digits only, e.g. `48291`
    Numeric,
    /// Upper-case letters and digits, e.g. `K7Q4M`
    Alphanumeric,
}

impl Default for TokenCharset {
    fn default() -> Self {
        TokenCharset::Numeric
    }
}

/// What happens to a freshly stored token when its message cannot be delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryFailurePolicy {
    /// Keep the record; the token stays valid for its lifetime
    Keep,
    /// Delete the record that was just written, unless it was already replaced
    RollBack,
}

impl Default for DeliveryFailurePolicy {
    fn default() -> Self {
        DeliveryFailurePolicy::Keep
    }
}

/// Token broker configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VerifierConfig {
    /// Number of characters in a generated token
    #[serde(default = "default_token_length")]
    pub token_length: usize,

    /// Seconds during which an issued token can be verified
    #[serde(default = "default_token_lifetime_secs")]
    pub token_lifetime_secs: u64,

    /// Minimum seconds between two issuances for the same mobile number
    #[serde(default = "default_resend_throttle_secs")]
    pub resend_throttle_secs: u64,

    /// Numeric or alphanumeric tokens
    #[serde(default)]
    pub token_charset: TokenCharset,

    /// Secret key for the token hasher
    #[serde(default = "default_hash_key")]
    pub hash_key: String,

    /// Upper bound for a single token store call, in milliseconds
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,

    /// Behaviour when the message sender fails
    #[serde(default)]
    pub delivery_failure: DeliveryFailurePolicy,

    /// Calling code (without `+`) used for numbers given in national format
    #[serde(default)]
    pub default_country_code: Option<String>,

    /// Period of the expired-token sweep in seconds; 0 disables it
    #[serde(default)]
    pub sweep_interval_secs: u64,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            token_length: default_token_length(),
            token_lifetime_secs: default_token_lifetime_secs(),
            resend_throttle_secs: default_resend_throttle_secs(),
            token_charset: TokenCharset::default(),
            hash_key: default_hash_key(),
            store_timeout_ms: default_store_timeout_ms(),
            delivery_failure: DeliveryFailurePolicy::default(),
            default_country_code: None,
            sweep_interval_secs: 0,
        }
    }
}

impl VerifierConfig {
    /// Set the token length
    pub fn with_token_length(mut self, length: usize) -> Self {
        self.token_length = length;
        self
    }

    /// Set the token lifetime in seconds
    pub fn with_lifetime_secs(mut self, secs: u64) -> Self {
        self.token_lifetime_secs = secs;
        self
    }

    /// Set the resend throttle window in seconds
    pub fn with_resend_throttle_secs(mut self, secs: u64) -> Self {
        self.resend_throttle_secs = secs;
        self
    }

    /// Set the token charset
    pub fn with_charset(mut self, charset: TokenCharset) -> Self {
        self.token_charset = charset;
        self
    }

    /// Set the delivery failure policy
    pub fn with_delivery_failure(mut self, policy: DeliveryFailurePolicy) -> Self {
        self.delivery_failure = policy;
        self
    }

    /// Set the default calling code for national-format numbers
    pub fn with_default_country_code(mut self, code: impl Into<String>) -> Self {
        self.default_country_code = Some(code.into());
        self
    }

    /// Check if using the development hash key (security warning)
    pub fn is_using_default_hash_key(&self) -> bool {
        self.hash_key == DEVELOPMENT_HASH_KEY
    }

    /// Reject values the broker cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_TOKEN_LENGTH..=MAX_TOKEN_LENGTH).contains(&self.token_length) {
            return Err(ConfigError::invalid(
                "verifier.token_length",
                format!(
                    "must be between {} and {}, got {}",
                    MIN_TOKEN_LENGTH, MAX_TOKEN_LENGTH, self.token_length
                ),
            ));
        }

        if self.token_lifetime_secs == 0 {
            return Err(ConfigError::invalid(
                "verifier.token_lifetime_secs",
                "must be greater than zero",
            ));
        }

        if self.token_lifetime_secs > MAX_WINDOW_SECS {
            return Err(ConfigError::invalid(
                "verifier.token_lifetime_secs",
                format!("must be at most {}, got {}", MAX_WINDOW_SECS, self.token_lifetime_secs),
            ));
        }

        if self.resend_throttle_secs > MAX_WINDOW_SECS {
            return Err(ConfigError::invalid(
                "verifier.resend_throttle_secs",
                format!("must be at most {}, got {}", MAX_WINDOW_SECS, self.resend_throttle_secs),
            ));
        }

        if self.store_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "verifier.store_timeout_ms",
                "must be greater than zero",
            ));
        }

        if self.hash_key.is_empty() {
            return Err(ConfigError::invalid("verifier.hash_key", "must not be empty"));
        }

        if let Some(code) = &self.default_country_code {
            let valid = !code.is_empty()
                && code.len() <= 3
                && code.chars().all(|c| c.is_ascii_digit())
                && !code.starts_with('0');
            if !valid {
                return Err(ConfigError::invalid(
                    "verifier.default_country_code",
                    format!("'{}' is not a calling code", code),
                ));
            }
        }

        Ok(())
    }
}

fn default_token_length() -> usize {
    5
}

fn default_token_lifetime_secs() -> u64 {
    300 // 5 minutes
}

fn default_resend_throttle_secs() -> u64 {
    60
}

fn default_hash_key() -> String {
    String::from(DEVELOPMENT_HASH_KEY)
}

fn default_store_timeout_ms() -> u64 {
    3000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = VerifierConfig::default();
        assert_eq!(config.token_length, 5);
        assert_eq!(config.token_lifetime_secs, 300);
        assert_eq!(config.resend_throttle_secs, 60);
        assert_eq!(config.token_charset, TokenCharset::Numeric);
        assert_eq!(config.delivery_failure, DeliveryFailurePolicy::Keep);
        assert!(config.is_using_default_hash_key());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_token_length_bounds() {
        assert!(VerifierConfig::default().with_token_length(3).validate().is_err());
        assert!(VerifierConfig::default().with_token_length(4).validate().is_ok());
        assert!(VerifierConfig::default().with_token_length(12).validate().is_ok());
        assert!(VerifierConfig::default().with_token_length(13).validate().is_err());
    }

    #[test]
    fn test_zero_lifetime_rejected() {
        let config = VerifierConfig::default().with_lifetime_secs(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_window_upper_bounds() {
        assert!(VerifierConfig::default().with_lifetime_secs(MAX_WINDOW_SECS).validate().is_ok());

        let err = VerifierConfig::default()
            .with_lifetime_secs(10_000_000_000_000)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "verifier.token_lifetime_secs"));

        let err = VerifierConfig::default()
            .with_lifetime_secs(u64::MAX)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "verifier.token_lifetime_secs"));

        let err = VerifierConfig::default()
            .with_resend_throttle_secs(MAX_WINDOW_SECS + 1)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "verifier.resend_throttle_secs"));
    }

    #[test]
    fn test_zero_throttle_allowed() {
        let config = VerifierConfig::default().with_resend_throttle_secs(0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_country_code_validation() {
        assert!(VerifierConfig::default().with_default_country_code("98").validate().is_ok());
        assert!(VerifierConfig::default().with_default_country_code("+98").validate().is_err());
        assert!(VerifierConfig::default().with_default_country_code("0").validate().is_err());
        assert!(VerifierConfig::default().with_default_country_code("1234").validate().is_err());
    }

    #[test]
    fn test_policy_serde_names() {
        let policy: DeliveryFailurePolicy = serde_json::from_str("\"roll_back\"").unwrap();
        assert_eq!(policy, DeliveryFailurePolicy::RollBack);
        let charset: TokenCharset = serde_json::from_str("\"alphanumeric\"").unwrap();
        assert_eq!(charset, TokenCharset::Alphanumeric);
    }
}
