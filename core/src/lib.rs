//! # Mobile Verifier Core
//!
//! Issues, stores and verifies short-lived one-time tokens bound to a
//! mobile number. This crate contains the domain types, the token broker,
//! the token store contract with an in-memory engine, and the error
//! taxonomy. Durable stores and SMS senders live in `mv_infra`.

pub mod domain;
pub mod errors;
pub mod repositories;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::*;
pub use errors::*;
pub use repositories::*;
pub use services::*;
