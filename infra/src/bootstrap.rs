//! Startup wiring
//!
//! Turns an [`AppConfig`] into a ready broker: connects the configured token
//! store, builds the configured sender and, when enabled, starts the
//! expired-token sweeper.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use mv_core::domain::{Subject, TokenHash, TokenRecord};
use mv_core::errors::DomainResult;
use mv_core::repositories::{InMemoryTokenStore, TokenStore};
use mv_core::services::{Clock, SystemClock, TokenBroker};
use mv_shared::{AppConfig, StorageBackend};

#[cfg(feature = "redis-cache")]
use crate::cache::{RedisClient, RedisTokenStore};
#[cfg(feature = "mysql")]
use crate::database::{DatabasePool, MySqlTokenStore};
use crate::sms::SmsSender;
use crate::InfrastructureError;

/// Token store selected by configuration
pub enum TokenStoreBackend {
    Memory(InMemoryTokenStore),
    #[cfg(feature = "mysql")]
    MySql(MySqlTokenStore),
    #[cfg(feature = "redis-cache")]
    Redis(RedisTokenStore),
}

impl TokenStoreBackend {
    /// Connect the store named by `config.storage.backend`
    pub async fn connect(config: &AppConfig) -> Result<Self, InfrastructureError> {
        match config.storage.backend {
            StorageBackend::Memory => {
                if config.environment.is_shared_deployment() {
                    warn!(
                        environment = %config.environment,
                        "In-memory token store selected; tokens are lost on restart and not shared between instances"
                    );
                }
                Ok(TokenStoreBackend::Memory(InMemoryTokenStore::new()))
            }
            #[cfg(feature = "mysql")]
            StorageBackend::MySql => {
                let pool = DatabasePool::new(&config.database).await?;
                let store = MySqlTokenStore::new(pool.get_pool().clone(), config.storage.table.clone())?;
                if config.database.ensure_schema {
                    store.ensure_schema().await?;
                }
                info!(table = %store.table(), "{}", pool.get_statistics());
                Ok(TokenStoreBackend::MySql(store))
            }
            #[cfg(not(feature = "mysql"))]
            StorageBackend::MySql => Err(InfrastructureError::Config(
                "storage.backend is mysql but the mysql feature is not enabled".to_string(),
            )),
            #[cfg(feature = "redis-cache")]
            StorageBackend::Redis => {
                let client = RedisClient::new(&config.cache).await?;
                let record_ttl = std::time::Duration::from_secs(
                    config
                        .verifier
                        .token_lifetime_secs
                        .saturating_add(config.storage.expired_retention_secs),
                );
                Ok(TokenStoreBackend::Redis(RedisTokenStore::new(
                    client,
                    config.storage.key_prefix.clone(),
                    record_ttl,
                )))
            }
            #[cfg(not(feature = "redis-cache"))]
            StorageBackend::Redis => Err(InfrastructureError::Config(
                "storage.backend is redis but the redis-cache feature is not enabled".to_string(),
            )),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TokenStoreBackend::Memory(_) => "memory",
            #[cfg(feature = "mysql")]
            TokenStoreBackend::MySql(_) => "mysql",
            #[cfg(feature = "redis-cache")]
            TokenStoreBackend::Redis(_) => "redis",
        }
    }

    fn inner(&self) -> &dyn TokenStore {
        match self {
            TokenStoreBackend::Memory(store) => store,
            #[cfg(feature = "mysql")]
            TokenStoreBackend::MySql(store) => store,
            #[cfg(feature = "redis-cache")]
            TokenStoreBackend::Redis(store) => store,
        }
    }
}

#[async_trait]
impl TokenStore for TokenStoreBackend {
    async fn save(&self, record: TokenRecord) -> DomainResult<()> {
        self.inner().save(record).await
    }

    async fn find(&self, subject: &Subject) -> DomainResult<Option<TokenRecord>> {
        self.inner().find(subject).await
    }

    async fn delete(&self, subject: &Subject) -> DomainResult<()> {
        self.inner().delete(subject).await
    }

    async fn exists_recent(
        &self,
        subject: &Subject,
        within: Duration,
        now: DateTime<Utc>,
    ) -> DomainResult<bool> {
        self.inner().exists_recent(subject, within, now).await
    }

    async fn delete_if_matches(&self, subject: &Subject, token_hash: &TokenHash) -> DomainResult<bool> {
        self.inner().delete_if_matches(subject, token_hash).await
    }

    async fn purge_expired(&self, lifetime: Duration, now: DateTime<Utc>) -> DomainResult<u64> {
        self.inner().purge_expired(lifetime, now).await
    }
}

/// Broker over the configured store and sender
pub type Broker = TokenBroker<TokenStoreBackend, SmsSender>;

/// Everything `build_broker` starts
pub struct VerifierServices {
    pub broker: Arc<Broker>,
    /// The sender the broker delivers through
    pub sender: Arc<SmsSender>,
    /// Background sweeper, when `verifier.sweep_interval_secs > 0`
    pub sweeper: Option<JoinHandle<()>>,
}

impl VerifierServices {
    /// Stop the background sweeper, if one is running
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.sweeper.take() {
            handle.abort();
            info!("Token sweeper stopped");
        }
    }
}

impl Drop for VerifierServices {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Build the broker described by `config`
pub async fn build_broker(config: &AppConfig) -> Result<VerifierServices, InfrastructureError> {
    build_broker_with_clock(config, Arc::new(SystemClock)).await
}

/// Like [`build_broker`], with an explicit time source
pub async fn build_broker_with_clock(
    config: &AppConfig,
    clock: Arc<dyn Clock>,
) -> Result<VerifierServices, InfrastructureError> {
    config.validate()?;

    if config.verifier.is_using_default_hash_key() && config.environment.is_shared_deployment() {
        warn!(
            environment = %config.environment,
            "verifier.hash_key is the development placeholder; set a secret key"
        );
    }

    let store = Arc::new(TokenStoreBackend::connect(config).await?);
    let sender = Arc::new(SmsSender::from_config(
        &config.sms,
        std::time::Duration::from_secs(config.verifier.token_lifetime_secs),
    )?);

    let broker = TokenBroker::from_config(store.clone(), sender.clone(), &config.verifier)?
        .with_clock(clock);

    let sweeper = if config.verifier.sweep_interval_secs > 0 {
        Arc::new(broker.sweeper()).start_background_task(std::time::Duration::from_secs(
            config.verifier.sweep_interval_secs,
        ))
    } else {
        None
    };

    info!(
        event = "broker_ready",
        environment = %config.environment,
        store = store.name(),
        sender = mv_core::services::MessageSender::provider_name(sender.as_ref()),
        token_length = config.verifier.token_length,
        token_lifetime_secs = config.verifier.token_lifetime_secs,
        resend_throttle_secs = config.verifier.resend_throttle_secs,
        sweeper = sweeper.is_some(),
        "Mobile verifier ready"
    );

    Ok(VerifierServices {
        broker: Arc::new(broker),
        sender,
        sweeper,
    })
}
