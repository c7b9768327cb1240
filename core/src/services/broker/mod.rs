//! Token broker module for mobile number verification
//!
//! This module provides the verification protocol:
//! - Token generation, hashing and storage
//! - Resend throttling per mobile number
//! - Single-use verification with distinct failure reasons
//! - Configurable handling of delivery failures

mod config;
mod service;
mod types;

#[cfg(test)]
mod tests;

pub use config::BrokerConfig;
pub use service::TokenBroker;
pub use types::{IssuedToken, VerifiedSubject};
