//! Verification outcomes and failures
//!
//! Every variant except [`VerificationError::Storage`] is a well-defined
//! business outcome the caller is expected to present to the user
//! ("code expired, resend?" vs "wrong code, try again"). None of them is
//! retried by the broker itself.

use mv_shared::ConfigError;
use thiserror::Error;

/// Failures reported by the token broker
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("A token was issued recently. Please try again in {retry_after_secs} seconds")]
    Throttled { retry_after_secs: u64 },

    #[error("Failed to deliver verification token: {reason}")]
    DeliveryFailed { reason: String },

    #[error("No verification token found")]
    TokenNotFound,

    #[error("Verification token expired")]
    TokenExpired,

    #[error("Invalid verification token")]
    InvalidToken,

    #[error("Token storage failure: {message}")]
    Storage { message: String },

    #[error("Invalid mobile number: {subject}")]
    InvalidSubject { subject: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl VerificationError {
    /// Shorthand for a storage failure
    pub fn storage(message: impl Into<String>) -> Self {
        VerificationError::Storage {
            message: message.into(),
        }
    }

    /// Shorthand for a configuration failure
    pub fn configuration(message: impl Into<String>) -> Self {
        VerificationError::Configuration {
            message: message.into(),
        }
    }

    /// Stable code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            VerificationError::Throttled { .. } => "THROTTLED",
            VerificationError::DeliveryFailed { .. } => "DELIVERY_FAILED",
            VerificationError::TokenNotFound => "TOKEN_NOT_FOUND",
            VerificationError::TokenExpired => "TOKEN_EXPIRED",
            VerificationError::InvalidToken => "INVALID_TOKEN",
            VerificationError::Storage { .. } => "STORAGE_FAILURE",
            VerificationError::InvalidSubject { .. } => "INVALID_SUBJECT",
            VerificationError::Configuration { .. } => "CONFIGURATION_ERROR",
        }
    }

    /// Whether a caller may retry the same request with backoff.
    /// Only storage failures can be transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, VerificationError::Storage { .. })
    }
}

impl From<ConfigError> for VerificationError {
    fn from(err: ConfigError) -> Self {
        VerificationError::configuration(err.to_string())
    }
}

/// Error returned by a message sender
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{provider} failed to send message: {message}")]
pub struct SendError {
    /// Name of the sender implementation
    pub provider: String,
    /// Provider-specific failure description
    pub message: String,
}

impl SendError {
    pub fn new(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

impl From<SendError> for VerificationError {
    fn from(err: SendError) -> Self {
        VerificationError::DeliveryFailed {
            reason: err.to_string(),
        }
    }
}
