//! Shared utilities and common types for the mobile verifier
//!
//! This crate provides common functionality used across the workspace:
//! - Configuration types and loading
//! - Logging initialization
//! - Phone number utilities (normalization, masking)
//! - Configuration error types

pub mod config;
pub mod errors;
pub mod logging;
pub mod utils;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, CacheConfig, DatabaseConfig, DeliveryFailurePolicy, Environment, LogFormat,
    LoggingConfig, SmsConfig, SmsProvider, StorageBackend, StorageConfig, TokenCharset,
    TwilioConfig, VerifierConfig,
};
pub use errors::ConfigError;
pub use logging::init_tracing;
pub use utils::phone;
