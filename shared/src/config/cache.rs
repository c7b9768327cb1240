//! Cache configuration module

use serde::{Deserialize, Serialize};

/// Redis connection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Redis connection URL
    pub url: String,

    /// Connection timeout in seconds
    pub connection_timeout: u64,

    /// Redis database number (0-15)
    #[serde(default)]
    pub database: u8,

    /// Connection attempts before giving up at startup
    #[serde(default = "default_connect_retries")]
    pub connect_retries: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: String::from("redis://localhost:6379"),
            connection_timeout: 5,
            database: 0,
            connect_retries: default_connect_retries(),
        }
    }
}

impl CacheConfig {
    /// Create a new cache configuration with URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the database number
    pub fn with_database(mut self, db: u8) -> Self {
        self.database = db.min(15);
        self
    }

    /// Connection URL with the database number applied
    pub fn connection_url(&self) -> String {
        if self.database == 0 {
            self.url.clone()
        } else {
            format!("{}/{}", self.url.trim_end_matches('/'), self.database)
        }
    }
}

fn default_connect_retries() -> u32 {
    3
}
