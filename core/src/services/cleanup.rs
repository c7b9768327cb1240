//! Periodic removal of expired token records
//!
//! Expired records are already treated as absent by the broker, so the
//! sweep only keeps storage small. It never runs on the verify path.

use std::sync::Arc;

use chrono::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::errors::DomainResult;
use crate::repositories::TokenStore;
use crate::services::clock::Clock;

/// Result of a sweep
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepResult {
    /// Number of expired records deleted
    pub purged: u64,
}

/// Deletes records older than the token lifetime
pub struct TokenSweeper<S: TokenStore> {
    store: Arc<S>,
    lifetime: Duration,
    clock: Arc<dyn Clock>,
}

impl<S: TokenStore> TokenSweeper<S> {
    pub fn new(store: Arc<S>, lifetime: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            lifetime,
            clock,
        }
    }

    /// Run a single sweep
    pub async fn run_once(&self) -> DomainResult<SweepResult> {
        let now = self.clock.now();
        let purged = self.store.purge_expired(self.lifetime, now).await?;

        if purged > 0 {
            info!(
                purged = purged,
                event = "expired_tokens_purged",
                "Purged expired verification tokens"
            );
        } else {
            debug!("No expired verification tokens to purge");
        }

        Ok(SweepResult { purged })
    }
}

impl<S: TokenStore + 'static> TokenSweeper<S> {
    /// Start the sweeper as a background task
    ///
    /// This spawns a tokio task that sweeps at regular intervals. A zero
    /// interval starts nothing and returns `None`.
    pub fn start_background_task(
        self: Arc<Self>,
        interval: std::time::Duration,
    ) -> Option<JoinHandle<()>> {
        if interval.is_zero() {
            warn!("Token sweeper interval is zero, sweeper not started");
            return None;
        }

        Some(tokio::spawn(async move {
            info!(
                interval_secs = interval.as_secs(),
                "Token sweeper started"
            );

            let mut interval_timer = tokio::time::interval(interval);

            loop {
                interval_timer.tick().await;

                if let Err(e) = self.run_once().await {
                    error!(error = %e, "Token sweep failed");
                }
            }
        }))
    }
}
