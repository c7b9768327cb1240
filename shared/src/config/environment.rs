//! Deployment environment and the logging defaults derived from it
//!
//! The environment is named by `MOBILE_VERIFIER_ENV`. It picks the logging
//! defaults and decides how strictly placeholder secrets are treated: a
//! production deployment refuses the development hash key outright, staging
//! only warns about it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ConfigError;

/// Variable that names the deployment environment
pub const ENVIRONMENT_VAR: &str = "MOBILE_VERIFIER_ENV";

/// Where the verifier is deployed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// A developer machine; placeholder secrets and the in-memory store are fine
    #[default]
    Development,
    /// Shared pre-release deployment
    Staging,
    /// Real subscribers receive real messages
    Production,
}

impl Environment {
    /// Read [`ENVIRONMENT_VAR`], defaulting to development when it is unset.
    /// A value that names no environment is an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(std::env::var(ENVIRONMENT_VAR).ok().as_deref())
    }

    /// Environment named by an optional raw value; blank counts as unset
    pub fn resolve(value: Option<&str>) -> Result<Self, ConfigError> {
        match value.map(str::trim) {
            None | Some("") => Ok(Environment::Development),
            Some(name) => name.parse(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }

    /// Whether the development hash key must be rejected at startup
    pub fn requires_secret_hash_key(&self) -> bool {
        self.is_production()
    }

    /// Whether several instances may serve the same subscribers, making
    /// placeholder secrets and process-local token stores worth a warning
    pub fn is_shared_deployment(&self) -> bool {
        !self.is_development()
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Environment::Development, Environment::Staging, Environment::Production]
            .into_iter()
            .find(|env| env.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                ConfigError::invalid(
                    ENVIRONMENT_VAR,
                    format!("'{}' is not one of development, staging, production", s),
                )
            })
    }
}

/// Tracing subscriber settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` overrides it
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: LogFormat,

    /// ANSI colors, pretty and compact formats only
    #[serde(default)]
    pub colored: bool,

    /// Attach file and line to each event
    #[serde(default)]
    pub source_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::for_environment(Environment::default())
    }
}

impl LoggingConfig {
    /// Logging defaults for `env`
    ///
    /// Development logs the verifier crates at debug in a readable format;
    /// deployed environments emit JSON for log shipping and keep sqlx quiet.
    pub fn for_environment(env: Environment) -> Self {
        match env {
            Environment::Development => Self {
                level: String::from("info,mv_core=debug,mv_infra=debug,mv_shared=debug"),
                format: LogFormat::Pretty,
                colored: true,
                source_location: true,
            },
            Environment::Staging => Self {
                level: String::from("info,mv_core=debug,sqlx=warn"),
                format: LogFormat::Json,
                colored: false,
                source_location: true,
            },
            Environment::Production => Self {
                level: String::from("info,sqlx=warn"),
                format: LogFormat::Json,
                colored: false,
                source_location: false,
            },
        }
    }
}

/// Output format of the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

fn default_log_format() -> LogFormat {
    LogFormat::Json
}
