//! Keyed one-way hashing of tokens
//!
//! Tokens are short (a 5-digit code has 100 000 possible values), so a
//! plain digest of a leaked row could be reversed by enumeration. The hash
//! is therefore an HMAC-SHA-256 under a server-side key.

use constant_time_eq::constant_time_eq;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::domain::TokenHash;
use crate::errors::{DomainResult, VerificationError};

type HmacSha256 = Hmac<Sha256>;

/// Deterministic keyed hasher for plaintext tokens
#[derive(Clone)]
pub struct TokenHasher {
    mac: HmacSha256,
}

impl TokenHasher {
    /// Create a hasher for the given secret key
    pub fn new(key: impl AsRef<[u8]>) -> DomainResult<Self> {
        let key = key.as_ref();
        if key.is_empty() {
            return Err(VerificationError::configuration("token hash key must not be empty"));
        }

        let mac = HmacSha256::new_from_slice(key)
            .map_err(|e| VerificationError::configuration(format!("invalid hash key: {}", e)))?;
        Ok(Self { mac })
    }

    /// Hex-encoded HMAC of the token
    pub fn hash(&self, token: &str) -> TokenHash {
        let mut mac = self.mac.clone();
        mac.update(token.as_bytes());
        TokenHash::from_stored(hex::encode(mac.finalize().into_bytes()))
    }

    /// Recompute the hash of `token` and compare it to `stored` in constant time
    pub fn matches(&self, token: &str, stored: &TokenHash) -> bool {
        let computed = self.hash(token);
        let a = computed.as_str().as_bytes();
        let b = stored.as_str().as_bytes();
        a.len() == b.len() && constant_time_eq(a, b)
    }
}

impl std::fmt::Debug for TokenHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenHasher").finish_non_exhaustive()
    }
}
