//! Postgres-backed job queue.
//!
//! The enqueuer appends rows to the `pending_jobs` table. A batch is
//! inserted inside one transaction, so either all jobs of a
//! reservation become visible to workers or none do, and their serial
//! ids preserve submission order.

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use thiserror::Error;
use tracing::debug;

use crate::jobs::{JobQueue, PendingJob};

/// Queue submission errors.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("job payload serialization: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("enqueue: {0}")]
    Database(#[source] sqlx::Error),
}

/// Enqueuer writing to the `pending_jobs` table.
#[derive(Clone)]
pub struct PgJobQueue {
    pool: PgPool,
}

impl PgJobQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobQueue for PgJobQueue {
    async fn enqueue(&self, jobs: &[PendingJob]) -> Result<(), QueueError> {
        if jobs.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(QueueError::Database)?;

        for job in jobs {
            sqlx::query("INSERT INTO pending_jobs (job_type, payload) VALUES ($1, $2)")
                .bind(job.job_type.as_str())
                .bind(&job.payload)
                .execute(&mut *tx)
                .await
                .map_err(QueueError::Database)?;
        }

        tx.commit().await.map_err(QueueError::Database)?;

        debug!(count = jobs.len(), "Enqueued job batch");
        Ok(())
    }
}
