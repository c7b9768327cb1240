//! Plaintext tokens and their stored hashes.

use std::fmt;

/// A freshly generated token as delivered to the user
///
/// The plaintext is never persisted and never logged; `Debug` is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct PlainToken(String);

impl PlainToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the plaintext for hashing or message rendering
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for PlainToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PlainToken(<redacted>)")
    }
}

/// Hex-encoded keyed hash of a token, as kept by token stores
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TokenHash(String);

impl TokenHash {
    /// Wrap a hash read back from storage
    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for TokenHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(8).collect();
        write!(f, "TokenHash({}..)", prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_token_debug_is_redacted() {
        let token = PlainToken::new("482913");
        let debug = format!("{:?}", token);
        assert!(!debug.contains("482913"));
        assert_eq!(token.expose(), "482913");
        assert_eq!(token.len(), 6);
    }

    #[test]
    fn test_token_hash_debug_is_truncated() {
        let hash = TokenHash::from_stored("0123456789abcdef0123456789abcdef");
        assert_eq!(format!("{:?}", hash), "TokenHash(01234567..)");
        assert_eq!(hash.into_inner(), "0123456789abcdef0123456789abcdef");
    }
}
