//! # Infrastructure Layer
//!
//! Concrete implementations of the capabilities the token broker consumes:
//!
//! - **Database**: MySQL token store using SQLx
//! - **Cache**: Redis token store
//! - **SMS**: message senders (log, Twilio)
//! - **Bootstrap**: selects store and sender from configuration and builds the broker
//!
//! ## Features
//!
//! - `mysql`: Enable the MySQL token store (default)
//! - `redis-cache`: Enable the Redis token store (default)
//! - `twilio-sms`: Enable the Twilio sender (default)

use mv_core::errors::VerificationError;
use mv_shared::ConfigError;

/// Database module - MySQL token store using SQLx
#[cfg(feature = "mysql")]
pub mod database;

/// Cache module - Redis token store
#[cfg(feature = "redis-cache")]
pub mod cache;

/// SMS module - Message sender implementations
pub mod sms;

/// Startup wiring
pub mod bootstrap;

pub use bootstrap::{build_broker, build_broker_with_clock, Broker, TokenStoreBackend, VerifierServices};
pub use sms::{LogSender, MessageTemplate, SmsSender};

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Redis cache error
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// SMS service error
    #[error("SMS service error: {0}")]
    Sms(String),

    /// Stored data could not be interpreted
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl From<ConfigError> for InfrastructureError {
    fn from(err: ConfigError) -> Self {
        InfrastructureError::Config(err.to_string())
    }
}

impl From<VerificationError> for InfrastructureError {
    fn from(err: VerificationError) -> Self {
        match err {
            VerificationError::Configuration { message } => InfrastructureError::Config(message),
            other => InfrastructureError::Config(other.to_string()),
        }
    }
}

impl From<InfrastructureError> for VerificationError {
    fn from(err: InfrastructureError) -> Self {
        match err {
            InfrastructureError::Config(message) => VerificationError::Configuration { message },
            other => VerificationError::Storage {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_errors_map_to_retryable_failures() {
        let err: VerificationError = InfrastructureError::Corrupt("created_at".to_string()).into();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("created_at"));

        let err: VerificationError =
            InfrastructureError::Cache(redis::RedisError::from((redis::ErrorKind::IoError, "reset")))
                .into();
        assert_eq!(err.error_code(), "STORAGE_FAILURE");
    }

    #[test]
    fn test_config_errors_stay_configuration_errors() {
        let err: VerificationError = InfrastructureError::Config("missing sid".to_string()).into();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");

        let err: InfrastructureError = ConfigError::invalid("sms.twilio.account_sid", "not set").into();
        assert!(matches!(err, InfrastructureError::Config(_)));
    }
}
