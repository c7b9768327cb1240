//! Redis client implementation
//!
//! Opens a multiplexed connection with bounded retries at startup. The
//! connection is cheap to clone and shared by every store operation.

use redis::{aio::MultiplexedConnection, Client, RedisError};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use mv_shared::CacheConfig;

use crate::InfrastructureError;

const INITIAL_RETRY_DELAY_MS: u64 = 100;
const MAX_RETRY_DELAY_MS: u64 = 5000;

/// Redis client with a shared multiplexed connection
#[derive(Clone)]
pub struct RedisClient {
    connection: MultiplexedConnection,
}

impl RedisClient {
    /// Connect using the cache configuration
    ///
    /// # Example
    /// ```no_run
    /// use mv_infra::cache::RedisClient;
    /// use mv_shared::CacheConfig;
    ///
    /// async fn create_client() -> Result<RedisClient, Box<dyn std::error::Error>> {
    ///     let client = RedisClient::new(&CacheConfig::new("redis://localhost:6379")).await?;
    ///     Ok(client)
    /// }
    /// ```
    pub async fn new(config: &CacheConfig) -> Result<Self, InfrastructureError> {
        let url = config.connection_url();
        info!(url = %mask_url(&url), "Creating Redis client");

        let client = Client::open(url.as_str()).map_err(|e| {
            error!(error = %e, "Failed to parse Redis URL");
            InfrastructureError::Config(format!("Invalid Redis URL: {}", e))
        })?;

        let connection = Self::create_connection_with_retry(
            client,
            config.connect_retries.max(1),
            Duration::from_secs(config.connection_timeout),
        )
        .await?;

        info!("Redis client created successfully");
        Ok(Self { connection })
    }

    /// Create multiplexed connection with retry logic
    async fn create_connection_with_retry(
        client: Client,
        max_retries: u32,
        connect_timeout: Duration,
    ) -> Result<MultiplexedConnection, InfrastructureError> {
        let mut attempts = 0;
        let mut delay = INITIAL_RETRY_DELAY_MS;

        loop {
            attempts += 1;
            debug!(attempt = attempts, "Connecting to Redis");

            let result = match tokio::time::timeout(
                connect_timeout,
                client.get_multiplexed_async_connection(),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(RedisError::from((
                    redis::ErrorKind::IoError,
                    "connection timed out",
                ))),
            };

            match result {
                Ok(connection) => return Ok(connection),
                Err(e) if attempts < max_retries && is_retriable_error(&e) => {
                    warn!(
                        attempt = attempts,
                        max_attempts = max_retries,
                        retry_in_ms = delay,
                        error = %e,
                        "Failed to connect to Redis"
                    );
                    sleep(Duration::from_millis(delay)).await;
                    delay = (delay * 2).min(MAX_RETRY_DELAY_MS);
                }
                Err(e) => {
                    error!(attempts, error = %e, "Giving up connecting to Redis");
                    return Err(InfrastructureError::Cache(e));
                }
            }
        }
    }

    /// A handle to the shared connection
    pub fn connection(&self) -> MultiplexedConnection {
        self.connection.clone()
    }

    /// Send a PING
    pub async fn health_check(&self) -> Result<bool, InfrastructureError> {
        let mut conn = self.connection();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong == "PONG")
    }
}

/// Check if a Redis error is worth retrying
pub(crate) fn is_retriable_error(error: &RedisError) -> bool {
    matches!(
        error.kind(),
        redis::ErrorKind::IoError
            | redis::ErrorKind::ClientError
            | redis::ErrorKind::BusyLoadingError
            | redis::ErrorKind::TryAgain
    )
}

/// Mask credentials in a Redis URL for logging
pub(crate) fn mask_url(url: &str) -> String {
    if let (Some(at_pos), Some(proto_end)) = (url.find('@'), url.find("://")) {
        return format!("{}****{}", &url[..proto_end + 3], &url[at_pos..]);
    }
    url.to_string()
}
