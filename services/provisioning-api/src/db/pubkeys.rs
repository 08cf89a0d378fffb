//! Pubkey lookups.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::db::DbError;

/// An SSH public key owned by an account.
#[derive(Debug, Clone)]
pub struct Pubkey {
    pub id: i64,
    pub account_id: i64,
    pub name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for Pubkey {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            account_id: row.try_get("account_id")?,
            name: row.try_get("name")?,
            body: row.try_get("body")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Pubkey persistence operations consumed by the orchestrator.
#[async_trait]
pub trait PubkeyDao: Send + Sync {
    /// Fetch an account's pubkey by id. Absent rows are `None`.
    async fn get_by_id(&self, account_id: i64, id: i64) -> Result<Option<Pubkey>, DbError>;
}

/// SQLx-backed pubkey store.
#[derive(Clone)]
pub struct PubkeyStore {
    pool: PgPool,
}

impl PubkeyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PubkeyDao for PubkeyStore {
    async fn get_by_id(&self, account_id: i64, id: i64) -> Result<Option<Pubkey>, DbError> {
        sqlx::query_as::<_, Pubkey>(
            r#"
            SELECT id, account_id, name, body, created_at
            FROM pubkeys
            WHERE account_id = $1 AND id = $2
            "#,
        )
        .bind(account_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DbError::Query {
            operation: "get pubkey by id",
            source: e,
        })
    }
}
