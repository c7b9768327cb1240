//! Error types for token issuance and verification.

mod verification_error;


pub use verification_error::{SendError, VerificationError};

/// Result alias used throughout the core crate
pub type DomainResult<T> = Result<T, VerificationError>;
