//! Reservation creation sequence.
//!
//! Strings together pubkey validation, reservation persistence,
//! launch credential resolution, image lookup and job submission.
//! Every step short-circuits on failure; already-persisted state is
//! not compensated (a failed run leaves the reservation row behind in
//! its `Created` status).

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::clients::{ImageBuilder, ImageBuilderError, Sources, SourcesError};
use crate::db::{DbError, NewReservation, Provider, PubkeyDao, Reservation, ReservationDao};
use crate::jobs::{
    JobQueue, JobType, LaunchInstanceArgs, PendingJob, PubkeyUploadArgs, QueueError,
};

/// Parsed body of an AWS reservation request.
#[derive(Debug, Clone, Deserialize)]
pub struct AwsReservationParams {
    pub source_id: String,
    pub pubkey_id: i64,
    pub image_id: String,
    pub amount: i32,
    pub instance_type: String,
}

/// Failures of the reservation creation sequence.
///
/// Translated to HTTP statuses at the API boundary.
#[derive(Debug, Error)]
pub enum CreateReservationError {
    #[error("invalid reservation request: {0}")]
    Validation(String),

    #[error("pubkey {id} not found")]
    PubkeyNotFound { id: i64 },

    #[error(transparent)]
    Database(#[from] DbError),

    #[error("launch credential resolution: {0}")]
    Sources(#[source] SourcesError),

    #[error("image lookup: {0}")]
    ImageBuilder(#[source] ImageBuilderError),

    #[error("enqueue reservation jobs: {0}")]
    Enqueue(#[source] QueueError),
}

/// Drives the end-to-end creation of a reservation.
pub struct ReservationOrchestrator {
    pubkeys: Arc<dyn PubkeyDao>,
    reservations: Arc<dyn ReservationDao>,
    sources: Arc<dyn Sources>,
    image_builder: Arc<dyn ImageBuilder>,
    queue: Arc<dyn JobQueue>,
}

impl ReservationOrchestrator {
    pub fn new(
        pubkeys: Arc<dyn PubkeyDao>,
        reservations: Arc<dyn ReservationDao>,
        sources: Arc<dyn Sources>,
        image_builder: Arc<dyn ImageBuilder>,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        Self {
            pubkeys,
            reservations,
            sources,
            image_builder,
            queue,
        }
    }

    /// Create an AWS reservation for the calling account and submit
    /// its background jobs.
    pub async fn create_aws(
        &self,
        account_id: i64,
        params: AwsReservationParams,
    ) -> Result<Reservation, CreateReservationError> {
        validate(&params)?;

        debug!(
            pubkey_id = params.pubkey_id,
            "Validating existence of pubkey for this account"
        );
        let pubkey = self
            .pubkeys
            .get_by_id(account_id, params.pubkey_id)
            .await?
            .ok_or(CreateReservationError::PubkeyNotFound {
                id: params.pubkey_id,
            })?;
        debug!(pubkey_id = pubkey.id, name = %pubkey.name, "Found pubkey");

        let reservation = self
            .reservations
            .create(NewReservation {
                account_id,
                source_id: params.source_id.clone(),
                pubkey_id: pubkey.id,
                image_id: params.image_id.clone(),
                amount: params.amount,
                instance_type: params.instance_type.clone(),
                status: "Created".to_string(),
                provider: Provider::Aws,
            })
            .await?;
        debug!(reservation_id = reservation.id, "Created a new reservation");

        let arn = self
            .sources
            .get_arn(&params.source_id)
            .await
            .map_err(CreateReservationError::Sources)?;

        let ami = self
            .image_builder
            .get_aws_ami(&params.image_id)
            .await
            .map_err(CreateReservationError::ImageBuilder)?;

        // The upload job must run before the launch job; a single batch
        // with a FIFO consumer preserves that order.
        let upload_job = PendingJob::new(
            JobType::PubkeyUploadAws,
            &PubkeyUploadArgs {
                account_id,
                reservation_id: reservation.id,
                pubkey_id: pubkey.id,
                arn: arn.clone(),
                source_id: params.source_id.clone(),
            },
        )
        .map_err(CreateReservationError::Enqueue)?;

        let launch_job = PendingJob::new(
            JobType::LaunchInstanceAws,
            &LaunchInstanceArgs {
                account_id,
                reservation_id: reservation.id,
                pubkey_id: pubkey.id,
                ami,
                arn,
                amount: params.amount,
                instance_type: params.instance_type.clone(),
            },
        )
        .map_err(CreateReservationError::Enqueue)?;

        debug!(
            reservation_id = reservation.id,
            source_id = %params.source_id,
            "Enqueuing pubkey upload and instance launch jobs"
        );
        self.queue
            .enqueue(&[upload_job, launch_job])
            .await
            .map_err(CreateReservationError::Enqueue)?;

        Ok(reservation)
    }
}

fn validate(params: &AwsReservationParams) -> Result<(), CreateReservationError> {
    if params.pubkey_id <= 0 {
        return Err(CreateReservationError::Validation(
            "pubkey_id must be positive".to_string(),
        ));
    }
    if params.source_id.is_empty() {
        return Err(CreateReservationError::Validation(
            "source_id cannot be empty".to_string(),
        ));
    }
    if params.image_id.is_empty() {
        return Err(CreateReservationError::Validation(
            "image_id cannot be empty".to_string(),
        ));
    }
    if params.amount < 1 {
        return Err(CreateReservationError::Validation(
            "amount must be at least 1".to_string(),
        ));
    }
    if params.instance_type.is_empty() {
        return Err(CreateReservationError::Validation(
            "instance_type cannot be empty".to_string(),
        ));
    }
    Ok(())
}
