//! Token store trait defining the persistence contract for token records.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::domain::{Subject, TokenHash, TokenRecord};
use crate::errors::DomainResult;

/// Keyed storage of token records, one per subject
///
/// Implementations fail with [`VerificationError::Storage`] on I/O errors
/// and must keep each operation atomic per subject.
///
/// # Security Considerations
/// - Only hashes are stored; plaintext tokens never reach the store
/// - `delete_if_matches` is the single-use gate and must be atomic
///
/// [`VerificationError::Storage`]: crate::errors::VerificationError::Storage
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Upsert the record for its subject, replacing any existing one
    ///
    /// Must be a single atomic replace: a concurrent `find` sees either the
    /// old or the new record, never neither.
    ///
    /// # Example
    /// ```
    /// # use chrono::Utc;
    /// # use mv_core::domain::{Subject, TokenHash, TokenRecord};
    /// # use mv_core::repositories::{InMemoryTokenStore, TokenStore};
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let store = InMemoryTokenStore::new();
    /// let subject = Subject::parse("+15551234567", None)?;
    ///
    /// store
    ///     .save(TokenRecord::new(subject.clone(), TokenHash::from_stored("h1"), Utc::now()))
    ///     .await?;
    /// store
    ///     .save(TokenRecord::new(subject.clone(), TokenHash::from_stored("h2"), Utc::now()))
    ///     .await?;
    ///
    /// let record = store.find(&subject).await?.expect("record exists");
    /// assert_eq!(record.token_hash.as_str(), "h2");
    /// # Ok(())
    /// # }
    /// ```
    async fn save(&self, record: TokenRecord) -> DomainResult<()>;

    /// Current record for `subject`, expired or not
    async fn find(&self, subject: &Subject) -> DomainResult<Option<TokenRecord>>;

    /// Remove the record for `subject`; absent records are not an error
    async fn delete(&self, subject: &Subject) -> DomainResult<()>;

    /// Whether a record for `subject` was created less than `within` before `now`
    ///
    /// This is the resend-throttle window and is evaluated on its own,
    /// regardless of whether the record is still verifiable.
    async fn exists_recent(
        &self,
        subject: &Subject,
        within: Duration,
        now: DateTime<Utc>,
    ) -> DomainResult<bool> {
        Ok(self
            .find(subject)
            .await?
            .map_or(false, |record| record.is_recent(within, now)))
    }

    /// Delete the record only if it still carries `token_hash`
    ///
    /// # Returns
    /// * `Ok(true)` - this call removed the record
    /// * `Ok(false)` - no record, or it was replaced by a newer issuance
    async fn delete_if_matches(&self, subject: &Subject, token_hash: &TokenHash)
        -> DomainResult<bool>;

    /// Delete every record created more than `lifetime` before `now`
    ///
    /// Returns the number of records removed.
    async fn purge_expired(&self, lifetime: Duration, now: DateTime<Utc>) -> DomainResult<u64>;
}
