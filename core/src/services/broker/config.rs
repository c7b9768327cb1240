//! Configuration for the token broker

use chrono::Duration;

use mv_shared::config::verifier::MAX_WINDOW_SECS;
use mv_shared::{DeliveryFailurePolicy, TokenCharset, VerifierConfig};

use crate::errors::{DomainResult, VerificationError};

/// Runtime settings of the token broker, derived from [`VerifierConfig`]
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Number of characters in a generated token
    pub token_length: usize,
    /// Window during which an issued token verifies
    pub token_lifetime: Duration,
    /// Minimum interval between issuances for the same subject
    pub resend_throttle: Duration,
    /// Numeric or alphanumeric tokens
    pub charset: TokenCharset,
    /// Upper bound for each token store call
    pub store_timeout: std::time::Duration,
    /// What to do with the stored record when delivery fails
    pub delivery_failure: DeliveryFailurePolicy,
    /// Calling code applied to national-format numbers
    pub default_country_code: Option<String>,
}

impl BrokerConfig {
    /// Longest lifetime or resend window the broker accepts
    pub fn max_window() -> Duration {
        Duration::days(1)
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        let defaults = VerifierConfig::default();
        Self {
            token_length: defaults.token_length,
            token_lifetime: Duration::minutes(5),
            resend_throttle: Duration::minutes(1),
            charset: defaults.token_charset,
            store_timeout: std::time::Duration::from_millis(defaults.store_timeout_ms),
            delivery_failure: defaults.delivery_failure,
            default_country_code: defaults.default_country_code,
        }
    }
}

impl TryFrom<&VerifierConfig> for BrokerConfig {
    type Error = VerificationError;

    fn try_from(config: &VerifierConfig) -> DomainResult<Self> {
        Ok(Self {
            token_length: config.token_length,
            token_lifetime: window("token lifetime", config.token_lifetime_secs)?,
            resend_throttle: window("resend throttle", config.resend_throttle_secs)?,
            charset: config.token_charset,
            store_timeout: std::time::Duration::from_millis(config.store_timeout_ms),
            delivery_failure: config.delivery_failure,
            default_country_code: config.default_country_code.clone(),
        })
    }
}

/// Seconds as a signed duration, refusing anything past [`MAX_WINDOW_SECS`]
fn window(name: &str, secs: u64) -> DomainResult<Duration> {
    if secs > MAX_WINDOW_SECS {
        return Err(VerificationError::configuration(format!(
            "{} of {}s exceeds the {}s maximum",
            name, secs, MAX_WINDOW_SECS
        )));
    }
    i64::try_from(secs)
        .map(Duration::seconds)
        .map_err(|_| VerificationError::configuration(format!("{} of {}s is out of range", name, secs)))
}
