//! MySQL implementation of the TokenStore trait.
//!
//! One row per mobile number. Issuing a new token upserts the row, so the
//! primary key enforces the "at most one live token per subject" rule, and
//! the conditional delete makes a token single-use across processes.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{MySqlPool, Row};

use mv_core::domain::{Subject, TokenHash, TokenRecord};
use mv_core::errors::DomainResult;
use mv_core::repositories::TokenStore;

use crate::InfrastructureError;

/// MySQL implementation of TokenStore
pub struct MySqlTokenStore {
    /// Database connection pool
    pool: MySqlPool,
    /// Validated table name
    table: String,
}

impl MySqlTokenStore {
    /// Create a store over `table`
    ///
    /// The name is interpolated into SQL, so only plain identifiers are accepted.
    pub fn new(pool: MySqlPool, table: impl Into<String>) -> Result<Self, InfrastructureError> {
        let table = table.into();
        if !is_valid_identifier(&table) {
            return Err(InfrastructureError::Config(format!(
                "storage.table '{}' is not a valid table name",
                table
            )));
        }
        Ok(Self { pool, table })
    }

    /// Table backing this store
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the token table if it does not exist
    pub async fn ensure_schema(&self) -> Result<(), InfrastructureError> {
        let query = format!(
            r#"
            CREATE TABLE IF NOT EXISTS `{table}` (
                mobile VARCHAR(20) NOT NULL PRIMARY KEY,
                token VARCHAR(64) NOT NULL,
                created_at DATETIME(6) NOT NULL,
                INDEX idx_created_at (created_at)
            )
            "#,
            table = self.table
        );

        sqlx::query(&query).execute(&self.pool).await?;
        tracing::info!(table = %self.table, "Token table ready");
        Ok(())
    }

    fn row_to_record(subject: &Subject, row: &sqlx::mysql::MySqlRow) -> Result<TokenRecord, InfrastructureError> {
        let token: String = row.try_get("token")?;
        let created_at: DateTime<Utc> = row.try_get("created_at")?;
        Ok(TokenRecord::new(
            subject.clone(),
            TokenHash::from_stored(token),
            created_at,
        ))
    }
}

fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    name.len() <= 64 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[async_trait]
impl TokenStore for MySqlTokenStore {
    async fn save(&self, record: TokenRecord) -> DomainResult<()> {
        let query = format!(
            r#"
            INSERT INTO `{}` (mobile, token, created_at)
            VALUES (?, ?, ?)
            ON DUPLICATE KEY UPDATE token = VALUES(token), created_at = VALUES(created_at)
            "#,
            self.table
        );

        sqlx::query(&query)
            .bind(record.subject.as_str())
            .bind(record.token_hash.as_str())
            .bind(record.created_at)
            .execute(&self.pool)
            .await
            .map_err(InfrastructureError::from)?;

        Ok(())
    }

    async fn find(&self, subject: &Subject) -> DomainResult<Option<TokenRecord>> {
        let query = format!(
            "SELECT token, created_at FROM `{}` WHERE mobile = ? LIMIT 1",
            self.table
        );

        let row = sqlx::query(&query)
            .bind(subject.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(InfrastructureError::from)?;

        match row {
            Some(row) => Ok(Some(Self::row_to_record(subject, &row)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, subject: &Subject) -> DomainResult<()> {
        let query = format!("DELETE FROM `{}` WHERE mobile = ?", self.table);

        sqlx::query(&query)
            .bind(subject.as_str())
            .execute(&self.pool)
            .await
            .map_err(InfrastructureError::from)?;

        Ok(())
    }

    async fn exists_recent(
        &self,
        subject: &Subject,
        within: Duration,
        now: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let query = format!(
            "SELECT COUNT(*) AS recent FROM `{}` WHERE mobile = ? AND created_at > ?",
            self.table
        );

        let row = sqlx::query(&query)
            .bind(subject.as_str())
            .bind(now - within)
            .fetch_one(&self.pool)
            .await
            .map_err(InfrastructureError::from)?;

        let recent: i64 = row.try_get("recent").map_err(InfrastructureError::from)?;
        Ok(recent > 0)
    }

    async fn delete_if_matches(&self, subject: &Subject, token_hash: &TokenHash) -> DomainResult<bool> {
        let query = format!("DELETE FROM `{}` WHERE mobile = ? AND token = ?", self.table);

        let result = sqlx::query(&query)
            .bind(subject.as_str())
            .bind(token_hash.as_str())
            .execute(&self.pool)
            .await
            .map_err(InfrastructureError::from)?;

        Ok(result.rows_affected() == 1)
    }

    async fn purge_expired(&self, lifetime: Duration, now: DateTime<Utc>) -> DomainResult<u64> {
        let query = format!("DELETE FROM `{}` WHERE created_at < ?", self.table);

        let result = sqlx::query(&query)
            .bind(now - lifetime)
            .execute(&self.pool)
            .await
            .map_err(InfrastructureError::from)?;

        Ok(result.rows_affected())
    }
}
