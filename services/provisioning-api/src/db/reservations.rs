//! Reservation creation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::db::DbError;

/// Cloud provider a reservation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Aws,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Aws => "aws",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to launch one or more compute instances.
#[derive(Debug, Clone)]
pub struct Reservation {
    pub id: i64,
    pub account_id: i64,
    pub source_id: String,
    pub pubkey_id: i64,
    pub image_id: String,
    pub arn: Option<String>,
    pub amount: i32,
    pub instance_type: String,
    pub status: String,
    pub provider: String,
    pub created_at: DateTime<Utc>,
}

/// Fields of a reservation row assigned by the caller.
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub account_id: i64,
    pub source_id: String,
    pub pubkey_id: i64,
    pub image_id: String,
    pub amount: i32,
    pub instance_type: String,
    pub status: String,
    pub provider: Provider,
}

impl<'r> sqlx::FromRow<'r, PgRow> for Reservation {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            account_id: row.try_get("account_id")?,
            source_id: row.try_get("source_id")?,
            pubkey_id: row.try_get("pubkey_id")?,
            image_id: row.try_get("image_id")?,
            arn: row.try_get("arn")?,
            amount: row.try_get("amount")?,
            instance_type: row.try_get("instance_type")?,
            status: row.try_get("status")?,
            provider: row.try_get("provider")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Reservation persistence operations consumed by the orchestrator.
#[async_trait]
pub trait ReservationDao: Send + Sync {
    /// Insert a reservation row; the id and timestamp are assigned by
    /// the database.
    async fn create(&self, reservation: NewReservation) -> Result<Reservation, DbError>;
}

/// SQLx-backed reservation store.
#[derive(Clone)]
pub struct ReservationStore {
    pool: PgPool,
}

impl ReservationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReservationDao for ReservationStore {
    async fn create(&self, reservation: NewReservation) -> Result<Reservation, DbError> {
        sqlx::query_as::<_, Reservation>(
            r#"
            INSERT INTO reservations
                (account_id, source_id, pubkey_id, image_id, amount, instance_type, status, provider)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, account_id, source_id, pubkey_id, image_id, arn,
                      amount, instance_type, status, provider, created_at
            "#,
        )
        .bind(reservation.account_id)
        .bind(&reservation.source_id)
        .bind(reservation.pubkey_id)
        .bind(&reservation.image_id)
        .bind(reservation.amount)
        .bind(&reservation.instance_type)
        .bind(&reservation.status)
        .bind(reservation.provider.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DbError::Query {
            operation: "create reservation",
            source: e,
        })
    }
}
