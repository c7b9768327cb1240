//! Redis implementation of the TokenStore trait.
//!
//! Each subject maps to one hash `{prefix}:{e164}` with the fields `token`
//! and `created_at` (Unix milliseconds). The hash is written in a single
//! MULTI/EXEC together with its TTL, and the conditional delete runs as a
//! Lua script so compare and delete happen atomically on the server.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use redis::Script;

use mv_core::domain::{Subject, TokenHash, TokenRecord};
use mv_core::errors::DomainResult;
use mv_core::repositories::TokenStore;

use super::redis_client::RedisClient;
use crate::InfrastructureError;

const DELETE_IF_MATCHES: &str = r#"
if redis.call('HGET', KEYS[1], 'token') == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

/// Redis implementation of TokenStore
pub struct RedisTokenStore {
    client: RedisClient,
    key_prefix: String,
    /// Key TTL: token lifetime plus the expired-record retention
    record_ttl_secs: u64,
    delete_script: Script,
}

impl RedisTokenStore {
    /// Create a store
    ///
    /// Records live for `record_ttl`; keep it longer than the token lifetime
    /// so that late attempts see an expired token rather than none.
    pub fn new(client: RedisClient, key_prefix: impl Into<String>, record_ttl: std::time::Duration) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
            record_ttl_secs: record_ttl.as_secs().max(1),
            delete_script: Script::new(DELETE_IF_MATCHES),
        }
    }

    fn key(&self, subject: &Subject) -> String {
        format!("{}:{}", self.key_prefix, subject.as_str())
    }
}

fn millis_to_datetime(millis: i64) -> Result<DateTime<Utc>, InfrastructureError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| InfrastructureError::Corrupt(format!("created_at {} out of range", millis)))
}

#[async_trait]
impl TokenStore for RedisTokenStore {
    async fn save(&self, record: TokenRecord) -> DomainResult<()> {
        let key = self.key(&record.subject);
        let mut conn = self.client.connection();

        redis::pipe()
            .atomic()
            .cmd("HSET")
            .arg(&key)
            .arg("token")
            .arg(record.token_hash.as_str())
            .arg("created_at")
            .arg(record.created_at.timestamp_millis())
            .ignore()
            .cmd("EXPIRE")
            .arg(&key)
            .arg(self.record_ttl_secs)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(InfrastructureError::from)?;

        Ok(())
    }

    async fn find(&self, subject: &Subject) -> DomainResult<Option<TokenRecord>> {
        let mut conn = self.client.connection();

        let (token, created_at): (Option<String>, Option<i64>) = redis::cmd("HMGET")
            .arg(self.key(subject))
            .arg("token")
            .arg("created_at")
            .query_async(&mut conn)
            .await
            .map_err(InfrastructureError::from)?;

        match (token, created_at) {
            (Some(token), Some(created_at)) => Ok(Some(TokenRecord::new(
                subject.clone(),
                TokenHash::from_stored(token),
                millis_to_datetime(created_at)?,
            ))),
            (None, None) => Ok(None),
            _ => Err(InfrastructureError::Corrupt(format!(
                "incomplete token record for {}",
                subject.masked()
            ))
            .into()),
        }
    }

    async fn delete(&self, subject: &Subject) -> DomainResult<()> {
        let mut conn = self.client.connection();

        redis::cmd("DEL")
            .arg(self.key(subject))
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(InfrastructureError::from)?;

        Ok(())
    }

    async fn delete_if_matches(&self, subject: &Subject, token_hash: &TokenHash) -> DomainResult<bool> {
        let mut conn = self.client.connection();

        let deleted: i64 = self
            .delete_script
            .key(self.key(subject))
            .arg(token_hash.as_str())
            .invoke_async(&mut conn)
            .await
            .map_err(InfrastructureError::from)?;

        Ok(deleted == 1)
    }

    async fn purge_expired(&self, _lifetime: Duration, _now: DateTime<Utc>) -> DomainResult<u64> {
        // Keys carry a TTL; Redis evicts them on its own.
        Ok(0)
    }
}
