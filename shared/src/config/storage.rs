//! Token storage configuration

use serde::{Deserialize, Serialize};

/// Token store engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local map; tokens do not survive a restart
    Memory,
    /// MySQL table via the `database` section
    MySql,
    /// Redis hashes via the `cache` section
    Redis,
}

impl Default for StorageBackend {
    fn default() -> Self {
        StorageBackend::Memory
    }
}

/// Token storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Which engine stores token records
    #[serde(default)]
    pub backend: StorageBackend,

    /// Table name for the MySQL backend
    #[serde(default = "default_table")]
    pub table: String,

    /// Key prefix for the Redis backend
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Seconds an expired record is kept by Redis before it disappears,
    /// so that late attempts still report expiry rather than absence
    #[serde(default = "default_expired_retention_secs")]
    pub expired_retention_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            table: default_table(),
            key_prefix: default_key_prefix(),
            expired_retention_secs: default_expired_retention_secs(),
        }
    }
}

fn default_table() -> String {
    String::from("mobile_verification_tokens")
}

fn default_key_prefix() -> String {
    String::from("mobile_verifier:token")
}

fn default_expired_retention_secs() -> u64 {
    3600
}
