//! Configuration module with business-specific sub-modules
//!
//! This module organizes configuration into logical areas:
//! - `verifier` - Token length, lifetime, throttle and hashing options
//! - `storage` - Which token store engine backs the broker
//! - `sms` - Which message sender delivers tokens
//! - `database` - MySQL connection and pool configuration
//! - `cache` - Redis connection configuration
//! - `environment` - `MOBILE_VERIFIER_ENV` and the logging defaults it selects

pub mod cache;
pub mod database;
pub mod environment;
pub mod sms;
pub mod storage;
pub mod verifier;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

// Re-export commonly used types
pub use cache::CacheConfig;
pub use database::DatabaseConfig;
pub use environment::{Environment, LogFormat, LoggingConfig, ENVIRONMENT_VAR};
pub use sms::{SmsConfig, SmsProvider, TwilioConfig};
pub use storage::{StorageBackend, StorageConfig};
pub use verifier::{DeliveryFailurePolicy, TokenCharset, VerifierConfig};

/// Default location of the optional configuration file
pub const DEFAULT_CONFIG_FILE: &str = "config/mobile_verifier";

/// Prefix of environment variables that override configuration values.
/// Nested keys are separated by a double underscore, e.g.
/// `MOBILE_VERIFIER__VERIFIER__TOKEN_LENGTH=6`.
pub const ENV_PREFIX: &str = "MOBILE_VERIFIER";

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Environment configuration
    #[serde(default)]
    pub environment: Environment,

    /// Token broker configuration
    #[serde(default)]
    pub verifier: VerifierConfig,

    /// Token store selection
    #[serde(default)]
    pub storage: StorageConfig,

    /// Message sender selection
    #[serde(default)]
    pub sms: SmsConfig,

    /// Database configuration (used by the `mysql` storage backend)
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Redis configuration (used by the `redis` storage backend)
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::for_environment(Environment::default())
    }
}

impl AppConfig {
    /// Defaults tuned for the given environment
    pub fn for_environment(environment: Environment) -> Self {
        Self {
            environment,
            verifier: VerifierConfig::default(),
            storage: StorageConfig::default(),
            sms: SmsConfig::default(),
            database: DatabaseConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::for_environment(environment),
        }
    }

    /// Load configuration from the default file and the environment
    ///
    /// Sources, in increasing precedence:
    /// 1. Built-in defaults for the environment named by `MOBILE_VERIFIER_ENV`
    /// 2. `config/mobile_verifier.{toml,yaml,json}` if present
    /// 3. `MOBILE_VERIFIER__*` environment variables (a `.env` file is read first)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Load configuration using an explicit file path (extension optional)
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = Self::for_environment(Environment::from_env()?);
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&defaults)?)
            .add_source(config::File::with_name(&path.to_string_lossy()).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let app_config: AppConfig = settings.try_deserialize()?;
        app_config.validate()?;

        tracing::debug!(
            environment = %app_config.environment,
            storage = ?app_config.storage.backend,
            sms_provider = ?app_config.sms.provider,
            "Loaded mobile verifier configuration"
        );

        Ok(app_config)
    }

    /// Validate every section that carries invariants
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.verifier.validate()?;
        self.sms.validate()?;

        if self.environment.requires_secret_hash_key() && self.verifier.is_using_default_hash_key() {
            return Err(ConfigError::invalid(
                "verifier.hash_key",
                "the development placeholder must not be used in production",
            ));
        }

        Ok(())
    }
}
