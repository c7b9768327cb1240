//! Cache module - Redis-backed token storage
//!
//! - `redis_client`: connection setup with retry and health check
//! - `token_store`: the Redis `TokenStore` engine

pub mod redis_client;
pub mod token_store;

#[cfg(test)]
mod tests;

pub use redis_client::RedisClient;
pub use token_store::RedisTokenStore;
