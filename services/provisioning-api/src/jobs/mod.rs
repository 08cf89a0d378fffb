//! Background job payloads and the enqueue facade.
//!
//! Jobs are type-tagged opaque payloads. This service only submits
//! them; workers consuming the queue live elsewhere. Jobs submitted in
//! one batch are executed in submission order by a single consumer.

pub mod queue;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use queue::{PgJobQueue, QueueError};

/// Job type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    PubkeyUploadAws,
    LaunchInstanceAws,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::PubkeyUploadAws => "pubkey_upload_aws",
            JobType::LaunchInstanceAws => "launch_instance_aws",
        }
    }
}

/// A job waiting to be picked up by a worker.
#[derive(Debug, Clone, Serialize)]
pub struct PendingJob {
    pub job_type: JobType,
    pub payload: serde_json::Value,
}

impl PendingJob {
    pub fn new<T: Serialize>(job_type: JobType, args: &T) -> Result<Self, QueueError> {
        Ok(Self {
            job_type,
            payload: serde_json::to_value(args).map_err(QueueError::Serialization)?,
        })
    }
}

/// Arguments of the pubkey upload job.
///
/// Ensures the account's SSH key exists on the target cloud account
/// before any instance is launched with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubkeyUploadArgs {
    pub account_id: i64,
    pub reservation_id: i64,
    pub pubkey_id: i64,
    pub arn: String,
    pub source_id: String,
}

/// Arguments of the instance launch job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchInstanceArgs {
    pub account_id: i64,
    pub reservation_id: i64,
    pub pubkey_id: i64,
    pub ami: String,
    pub arn: String,
    pub amount: i32,
    pub instance_type: String,
}

/// Queue operations consumed by the orchestrator.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Submit a batch of jobs. The call returns once the batch is
    /// accepted; it does not wait for execution.
    async fn enqueue(&self, jobs: &[PendingJob]) -> Result<(), QueueError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_type_tags() {
        assert_eq!(JobType::PubkeyUploadAws.as_str(), "pubkey_upload_aws");
        assert_eq!(JobType::LaunchInstanceAws.as_str(), "launch_instance_aws");
    }

    #[test]
    fn test_launch_payload_serialization() {
        let job = PendingJob::new(
            JobType::LaunchInstanceAws,
            &LaunchInstanceArgs {
                account_id: 1,
                reservation_id: 7,
                pubkey_id: 3,
                ami: "ami-0abc".to_string(),
                arn: "arn:aws:iam::123456789:role/launch".to_string(),
                amount: 2,
                instance_type: "t3.small".to_string(),
            },
        )
        .unwrap();

        assert_eq!(job.job_type, JobType::LaunchInstanceAws);
        assert_eq!(job.payload["ami"], "ami-0abc");
        assert_eq!(job.payload["amount"], 2);
        assert_eq!(job.payload["instance_type"], "t3.small");
    }
}
