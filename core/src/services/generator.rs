//! Cryptographically secure token generation.

use rand::rngs::OsRng;
use rand::Rng;

use mv_shared::config::verifier::{MAX_TOKEN_LENGTH, MIN_TOKEN_LENGTH};
use mv_shared::TokenCharset;

use crate::domain::PlainToken;
use crate::errors::{DomainResult, VerificationError};

const NUMERIC_ALPHABET: &[u8] = b"0123456789";

// Upper-case letters and digits without 0/O and 1/I
const ALPHANUMERIC_ALPHABET: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZ";

/// Generates plaintext tokens from the OS random source
#[derive(Debug, Clone)]
pub struct TokenGenerator {
    length: usize,
    charset: TokenCharset,
}

impl TokenGenerator {
    pub fn new(length: usize, charset: TokenCharset) -> DomainResult<Self> {
        if !(MIN_TOKEN_LENGTH..=MAX_TOKEN_LENGTH).contains(&length) {
            return Err(VerificationError::configuration(format!(
                "token length must be between {} and {}, got {}",
                MIN_TOKEN_LENGTH, MAX_TOKEN_LENGTH, length
            )));
        }
        Ok(Self { length, charset })
    }

    pub fn charset(&self) -> TokenCharset {
        self.charset
    }

    /// Draw a new token; every character is sampled uniformly
    pub fn generate(&self) -> PlainToken {
        let alphabet = Self::alphabet(self.charset);
        let mut rng = OsRng;
        let token: String = (0..self.length)
            .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
            .collect();
        PlainToken::new(token)
    }

    /// Bring a user submission into the form tokens are generated in
    pub fn canonicalize(&self, submitted: &str) -> String {
        let trimmed = submitted.trim();
        match self.charset {
            TokenCharset::Numeric => trimmed.to_string(),
            TokenCharset::Alphanumeric => trimmed.to_ascii_uppercase(),
        }
    }

    fn alphabet(charset: TokenCharset) -> &'static [u8] {
        match charset {
            TokenCharset::Numeric => NUMERIC_ALPHABET,
            TokenCharset::Alphanumeric => ALPHANUMERIC_ALPHABET,
        }
    }
}
