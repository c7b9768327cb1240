//! Process-local token store

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::{Subject, TokenHash, TokenRecord};
use crate::errors::DomainResult;

use super::r#trait::TokenStore;

/// Token store backed by a map behind an async lock
///
/// Every operation takes the lock once, which makes each of them atomic
/// per subject. Records do not survive a restart.
#[derive(Clone, Default)]
pub struct InMemoryTokenStore {
    records: Arc<RwLock<HashMap<Subject, TokenRecord>>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, expired ones included
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn save(&self, record: TokenRecord) -> DomainResult<()> {
        let mut records = self.records.write().await;
        records.insert(record.subject.clone(), record);
        Ok(())
    }

    async fn find(&self, subject: &Subject) -> DomainResult<Option<TokenRecord>> {
        let records = self.records.read().await;
        Ok(records.get(subject).cloned())
    }

    async fn delete(&self, subject: &Subject) -> DomainResult<()> {
        let mut records = self.records.write().await;
        records.remove(subject);
        Ok(())
    }

    async fn exists_recent(
        &self,
        subject: &Subject,
        within: Duration,
        now: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let records = self.records.read().await;
        Ok(records
            .get(subject)
            .map_or(false, |record| record.is_recent(within, now)))
    }

    async fn delete_if_matches(
        &self,
        subject: &Subject,
        token_hash: &TokenHash,
    ) -> DomainResult<bool> {
        let mut records = self.records.write().await;
        match records.get(subject) {
            Some(record) if &record.token_hash == token_hash => {
                records.remove(subject);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn purge_expired(&self, lifetime: Duration, now: DateTime<Utc>) -> DomainResult<u64> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, record| !record.is_expired(lifetime, now));
        Ok((before - records.len()) as u64)
    }
}
