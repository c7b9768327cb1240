//! Token record entity: the only state the broker persists.

use chrono::{DateTime, Duration, Utc};

use crate::domain::value_objects::{Subject, TokenHash};

/// Stored issuance for one subject
///
/// At most one record exists per subject; a new issuance replaces the
/// previous one. Expiry and resend eligibility are both derived from
/// `created_at` and evaluated independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    /// Normalized mobile number
    pub subject: Subject,

    /// Keyed hash of the plaintext token
    pub token_hash: TokenHash,

    /// Timestamp of issuance
    pub created_at: DateTime<Utc>,
}

impl TokenRecord {
    pub fn new(subject: Subject, token_hash: TokenHash, created_at: DateTime<Utc>) -> Self {
        Self {
            subject,
            token_hash,
            created_at,
        }
    }

    /// A record is expired once strictly more than `lifetime` has passed
    pub fn is_expired(&self, lifetime: Duration, now: DateTime<Utc>) -> bool {
        now - self.created_at > lifetime
    }

    /// Whether the record was created less than `within` ago
    pub fn is_recent(&self, within: Duration, now: DateTime<Utc>) -> bool {
        now - self.created_at < within
    }

    /// Last instant at which the token still verifies, if representable
    pub fn expires_at(&self, lifetime: Duration) -> Option<DateTime<Utc>> {
        self.created_at.checked_add_signed(lifetime)
    }
}
