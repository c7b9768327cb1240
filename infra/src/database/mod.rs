//! Database module - MySQL token store using SQLx
//!
//! This module provides:
//! - Connection pool management
//! - The MySQL `TokenStore` engine

pub mod connection;
pub mod mysql;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use connection::{DatabasePool, PoolStatistics};
pub use mysql::MySqlTokenStore;
