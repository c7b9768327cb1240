//! Types for broker results

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::Subject;

/// Result of a successful token request
///
/// Carries no plaintext token; that only leaves the broker through the
/// message sender.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    /// Normalized mobile number the token was sent to
    pub subject: Subject,
    /// The message ID from the provider
    pub message_id: String,
    /// When the token stops verifying
    pub expires_at: DateTime<Utc>,
    /// When the user can request another token
    pub next_resend_at: DateTime<Utc>,
}

/// Result of a successful verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedSubject {
    /// Normalized mobile number the caller should mark as verified
    pub subject: Subject,
    pub verified_at: DateTime<Utc>,
}
