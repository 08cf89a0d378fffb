//! Reservation API endpoints.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, warn};

use crate::api::error::ApiError;
use crate::api::request_context::RequestContext;
use crate::clients::SourcesError;
use crate::db::Reservation;
use crate::orchestrator::{AwsReservationParams, CreateReservationError};
use crate::state::AppState;

/// Create reservation routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/aws", post(create_aws_reservation))
}

/// Response for a created reservation.
#[derive(Debug, Serialize)]
pub struct ReservationResponse {
    /// Reservation ID.
    pub id: i64,

    /// Source the launch credential is resolved from.
    pub source_id: String,

    /// Referenced pubkey ID.
    pub pubkey_id: i64,

    /// Referenced image compose ID.
    pub image_id: String,

    /// Number of instances to launch.
    pub amount: i32,

    /// Instance type to launch.
    pub instance_type: String,

    /// Reservation status.
    pub status: String,

    /// Target cloud provider.
    pub provider: String,

    /// When the reservation was created.
    pub created_at: DateTime<Utc>,
}

impl From<Reservation> for ReservationResponse {
    fn from(reservation: Reservation) -> Self {
        Self {
            id: reservation.id,
            source_id: reservation.source_id,
            pubkey_id: reservation.pubkey_id,
            image_id: reservation.image_id,
            amount: reservation.amount,
            instance_type: reservation.instance_type,
            status: reservation.status,
            provider: reservation.provider,
            created_at: reservation.created_at,
        }
    }
}

/// Create an AWS reservation and schedule its background jobs.
///
/// POST /v1/reservations/aws
async fn create_aws_reservation(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, ApiError> {
    let request_id = ctx.request_id.clone();

    let params: AwsReservationParams = serde_json::from_value(body).map_err(|e| {
        ApiError::bad_request("invalid_request", e.to_string())
            .with_request_id(request_id.clone())
    })?;

    match state
        .orchestrator()
        .create_aws(ctx.account_id, params)
        .await
    {
        Ok(reservation) => Ok((
            StatusCode::CREATED,
            Json(ReservationResponse::from(reservation)),
        )),
        Err(err) => {
            let api_error = translate_create_error(&err, &request_id);
            if api_error.status.is_server_error() {
                error!(error = %err, request_id = %request_id, "Reservation creation failed");
            } else {
                warn!(error = %err, request_id = %request_id, "Reservation creation rejected");
            }
            Err(api_error)
        }
    }
}

/// Map orchestration failures to caller-visible statuses.
fn translate_create_error(err: &CreateReservationError, request_id: &str) -> ApiError {
    let api_error = match err {
        CreateReservationError::Validation(msg) => {
            ApiError::bad_request("invalid_request", msg.clone())
        }
        CreateReservationError::PubkeyNotFound { id } => {
            ApiError::not_found("pubkey_not_found", format!("Pubkey {id} not found"))
        }
        CreateReservationError::Sources(source_err) => match source_err {
            SourcesError::ApplicationNotFound => ApiError::not_found(
                "application_not_found",
                "Cannot resolve launch credential: application not found",
            ),
            SourcesError::AuthenticationNotFound
            | SourcesError::MissingAuthentication { .. } => ApiError::not_found(
                "authentication_not_found",
                "Cannot resolve launch credential: authentication not found",
            ),
            SourcesError::ApplicationTypeNotFound
            | SourcesError::SourceNotFound
            | SourcesError::MoreThanOneAuthentication { .. }
            | SourcesError::MalformedAuthentication { .. }
            | SourcesError::AuthenticationSourceAssociation { .. }
            | SourcesError::UnexpectedStatus { .. }
            | SourcesError::Transport { .. }
            | SourcesError::Initialization(_) => ApiError::internal(
                "sources_error",
                "Cannot resolve launch credential from sources",
            ),
        },
        CreateReservationError::Database(_) => {
            ApiError::internal("database_error", "Database operation failed")
        }
        CreateReservationError::ImageBuilder(_) => {
            ApiError::internal("image_builder_error", "Cannot resolve machine image")
        }
        CreateReservationError::Enqueue(_) => {
            ApiError::internal("enqueue_failed", "Cannot schedule reservation jobs")
        }
    };
    api_error.with_request_id(request_id.to_string())
}
