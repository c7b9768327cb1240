//! Main token broker implementation

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use mv_shared::{DeliveryFailurePolicy, VerifierConfig};

use crate::domain::{Subject, TokenHash, TokenRecord};
use crate::errors::{DomainResult, VerificationError};
use crate::repositories::TokenStore;
use crate::services::cleanup::TokenSweeper;
use crate::services::clock::{Clock, SystemClock};
use crate::services::generator::TokenGenerator;
use crate::services::hasher::TokenHasher;
use crate::services::sender::MessageSender;

use super::config::BrokerConfig;
use super::types::{IssuedToken, VerifiedSubject};

/// Issues and verifies one-time tokens bound to mobile numbers
///
/// The broker keeps no state of its own; everything lives in the token
/// store, one record per subject. Per subject the lifecycle is
/// `NoToken -> Issued -> Verified | Expired | Replaced`.
pub struct TokenBroker<S: TokenStore, M: MessageSender> {
    /// Persistence for token records
    store: Arc<S>,
    /// Delivery of plaintext tokens
    sender: Arc<M>,
    hasher: TokenHasher,
    generator: TokenGenerator,
    clock: Arc<dyn Clock>,
    config: BrokerConfig,
}

impl<S: TokenStore, M: MessageSender> TokenBroker<S, M> {
    /// Create a new token broker
    ///
    /// # Arguments
    ///
    /// * `store` - Token store implementation
    /// * `sender` - Message sender implementation
    /// * `hasher` - Keyed hasher for stored tokens
    /// * `config` - Broker configuration
    pub fn new(
        store: Arc<S>,
        sender: Arc<M>,
        hasher: TokenHasher,
        config: BrokerConfig,
    ) -> DomainResult<Self> {
        if config.token_lifetime <= Duration::zero() {
            return Err(VerificationError::configuration("token lifetime must be positive"));
        }
        if config.resend_throttle < Duration::zero() {
            return Err(VerificationError::configuration("resend throttle must not be negative"));
        }
        if config.token_lifetime > BrokerConfig::max_window()
            || config.resend_throttle > BrokerConfig::max_window()
        {
            return Err(VerificationError::configuration(
                "token lifetime and resend throttle must not exceed one day",
            ));
        }
        if config.store_timeout.is_zero() {
            return Err(VerificationError::configuration("store timeout must be positive"));
        }

        let generator = TokenGenerator::new(config.token_length, config.charset)?;

        Ok(Self {
            store,
            sender,
            hasher,
            generator,
            clock: Arc::new(SystemClock),
            config,
        })
    }

    /// Validate `config` and build the broker with a hasher keyed by `hash_key`
    pub fn from_config(store: Arc<S>, sender: Arc<M>, config: &VerifierConfig) -> DomainResult<Self> {
        config.validate()?;
        let hasher = TokenHasher::new(config.hash_key.as_bytes())?;
        Self::new(store, sender, hasher, BrokerConfig::try_from(config)?)
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Sweeper purging records of this broker's store, on its clock and lifetime
    pub fn sweeper(&self) -> TokenSweeper<S> {
        TokenSweeper::new(
            self.store.clone(),
            self.config.token_lifetime,
            self.clock.clone(),
        )
    }

    /// Issue a token for a mobile number and deliver it
    ///
    /// This method:
    /// 1. Normalizes the mobile number
    /// 2. Rejects the request if a token was issued within the resend window
    /// 3. Generates a new token and stores its hash, replacing any previous one
    /// 4. Sends the plaintext token through the message sender
    ///
    /// # Returns
    ///
    /// * `Ok(IssuedToken)` - Delivery details and the relevant deadlines
    /// * `Err(VerificationError)` - `Throttled`, `DeliveryFailed`, `Storage`, `InvalidSubject`,
    ///   or `Configuration` when a deadline cannot be represented
    pub async fn request_token(&self, raw_subject: &str) -> DomainResult<IssuedToken> {
        let subject = self.parse_subject(raw_subject)?;
        let now = self.clock.now();

        if self.config.resend_throttle > Duration::zero() {
            let recent = self
                .guarded(
                    "exists_recent",
                    self.store
                        .exists_recent(&subject, self.config.resend_throttle, now),
                )
                .await?;

            if recent {
                let retry_after_secs = self.retry_after_secs(&subject, now).await;
                tracing::warn!(
                    phone = %subject.masked(),
                    retry_after_secs = retry_after_secs,
                    event = "token_throttled",
                    "Token request rejected by resend throttle"
                );
                return Err(VerificationError::Throttled { retry_after_secs });
            }
        }

        let (expires_at, next_resend_at) = self.deadlines(now)?;

        let token = self.generator.generate();
        let token_hash = self.hasher.hash(token.expose());

        self.guarded(
            "save",
            self.store
                .save(TokenRecord::new(subject.clone(), token_hash.clone(), now)),
        )
        .await?;

        let message_id = match self.sender.send(&subject, &token).await {
            Ok(message_id) => message_id,
            Err(err) => {
                tracing::error!(
                    phone = %subject.masked(),
                    provider = self.sender.provider_name(),
                    error = %err,
                    event = "delivery_failed",
                    "Failed to deliver verification token"
                );
                self.handle_delivery_failure(&subject, &token_hash).await;
                return Err(err.into());
            }
        };

        tracing::info!(
            phone = %subject.masked(),
            provider = self.sender.provider_name(),
            message_id = %message_id,
            event = "token_issued",
            "Issued verification token"
        );

        Ok(IssuedToken {
            subject,
            message_id,
            expires_at,
            next_resend_at,
        })
    }

    /// Verify a submitted token and consume it
    ///
    /// Surrounding whitespace is ignored and alphanumeric tokens compare
    /// case-insensitively. On success the record is deleted, so the same
    /// token never verifies twice.
    ///
    /// # Returns
    ///
    /// * `Ok(VerifiedSubject)` - The normalized number to mark as verified
    /// * `Err(VerificationError)` - `TokenNotFound`, `TokenExpired`, `InvalidToken`,
    ///   `Storage` or `InvalidSubject`
    pub async fn verify_token(
        &self,
        raw_subject: &str,
        submitted: &str,
    ) -> DomainResult<VerifiedSubject> {
        let subject = self.parse_subject(raw_subject)?;
        let now = self.clock.now();

        let record = match self.guarded("find", self.store.find(&subject)).await? {
            Some(record) => record,
            None => {
                tracing::info!(
                    phone = %subject.masked(),
                    event = "token_not_found",
                    "No verification token on record"
                );
                return Err(VerificationError::TokenNotFound);
            }
        };

        if record.is_expired(self.config.token_lifetime, now) {
            tracing::info!(
                phone = %subject.masked(),
                issued_at = %record.created_at,
                event = "token_expired",
                "Verification token expired"
            );
            self.discard_expired(&record).await;
            return Err(VerificationError::TokenExpired);
        }

        let candidate = self.generator.canonicalize(submitted);
        if !self.hasher.matches(&candidate, &record.token_hash) {
            tracing::warn!(
                phone = %subject.masked(),
                event = "token_mismatch",
                "Submitted verification token does not match"
            );
            return Err(VerificationError::InvalidToken);
        }

        // Only the caller whose conditional delete removes the record wins
        let consumed = self
            .guarded(
                "delete_if_matches",
                self.store.delete_if_matches(&subject, &record.token_hash),
            )
            .await?;

        if !consumed {
            tracing::warn!(
                phone = %subject.masked(),
                event = "token_not_found",
                "Verification token was consumed or replaced concurrently"
            );
            return Err(VerificationError::TokenNotFound);
        }

        tracing::info!(
            phone = %subject.masked(),
            event = "token_verified",
            "Mobile number verified"
        );

        Ok(VerifiedSubject {
            subject,
            verified_at: now,
        })
    }

    /// Delete any outstanding token for a mobile number
    pub async fn invalidate(&self, raw_subject: &str) -> DomainResult<()> {
        let subject = self.parse_subject(raw_subject)?;

        self.guarded("delete", self.store.delete(&subject)).await?;

        tracing::info!(
            phone = %subject.masked(),
            event = "token_invalidated",
            "Invalidated verification token"
        );
        Ok(())
    }

    fn parse_subject(&self, raw_subject: &str) -> DomainResult<Subject> {
        Subject::parse(raw_subject, self.config.default_country_code.as_deref()).map_err(|err| {
            tracing::warn!(error = %err, event = "invalid_subject", "Rejected mobile number");
            err
        })
    }

    /// Expiry and next-resend instants for a token issued at `now`
    fn deadlines(&self, now: DateTime<Utc>) -> DomainResult<(DateTime<Utc>, DateTime<Utc>)> {
        let expires_at = now.checked_add_signed(self.config.token_lifetime);
        let next_resend_at = now.checked_add_signed(self.config.resend_throttle);

        match (expires_at, next_resend_at) {
            (Some(expires_at), Some(next_resend_at)) => Ok((expires_at, next_resend_at)),
            _ => {
                tracing::error!(now = %now, "Token deadlines fall outside the representable time range");
                Err(VerificationError::configuration(
                    "token deadlines fall outside the representable time range",
                ))
            }
        }
    }

    /// Seconds left in the resend window, rounded up
    async fn retry_after_secs(&self, subject: &Subject, now: DateTime<Utc>) -> u64 {
        let full_window = self.config.resend_throttle.num_seconds().max(1) as u64;

        match self.guarded("find", self.store.find(subject)).await {
            Ok(Some(record)) => match record.created_at.checked_add_signed(self.config.resend_throttle) {
                Some(resend_at) => {
                    let millis = (resend_at - now).num_milliseconds().max(0);
                    ((millis + 999) / 1000).max(1) as u64
                }
                None => full_window,
            },
            _ => full_window,
        }
    }

    async fn handle_delivery_failure(&self, subject: &Subject, token_hash: &TokenHash) {
        match self.config.delivery_failure {
            DeliveryFailurePolicy::Keep => {
                tracing::debug!(
                    phone = %subject.masked(),
                    "Keeping stored token after delivery failure"
                );
            }
            DeliveryFailurePolicy::RollBack => {
                match self
                    .guarded(
                        "delete_if_matches",
                        self.store.delete_if_matches(subject, token_hash),
                    )
                    .await
                {
                    Ok(removed) => tracing::info!(
                        phone = %subject.masked(),
                        removed = removed,
                        event = "token_rolled_back",
                        "Rolled back token after delivery failure"
                    ),
                    Err(err) => tracing::error!(
                        phone = %subject.masked(),
                        error = %err,
                        "Failed to roll back token after delivery failure"
                    ),
                }
            }
        }
    }

    /// Lazy cleanup of an expired record; failures only get logged
    async fn discard_expired(&self, record: &TokenRecord) {
        if let Err(err) = self
            .guarded(
                "delete_if_matches",
                self.store
                    .delete_if_matches(&record.subject, &record.token_hash),
            )
            .await
        {
            tracing::warn!(
                phone = %record.subject.masked(),
                error = %err,
                "Failed to delete expired verification token"
            );
        }
    }

    /// Run a store call under the configured timeout
    async fn guarded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = DomainResult<T>>,
    ) -> DomainResult<T> {
        match tokio::time::timeout(self.config.store_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                tracing::error!(
                    operation = operation,
                    error = %err,
                    event = "store_failure",
                    "Token store call failed"
                );
                Err(err)
            }
            Err(_) => {
                let timeout_ms = self.config.store_timeout.as_millis() as u64;
                tracing::error!(
                    operation = operation,
                    timeout_ms = timeout_ms,
                    event = "store_timeout",
                    "Token store call timed out"
                );
                Err(VerificationError::storage(format!(
                    "{} timed out after {} ms",
                    operation, timeout_ms
                )))
            }
        }
    }
}
