//! Configuration error types

use thiserror::Error;

/// Errors raised while loading, validating or applying configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration sources could not be read or deserialized
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// A configuration value is present but not usable
    #[error("Invalid configuration for {field}: {message}")]
    Invalid { field: String, message: String },

    /// The logging subscriber could not be installed
    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

impl ConfigError {
    /// Shorthand for an [`ConfigError::Invalid`] value
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}
