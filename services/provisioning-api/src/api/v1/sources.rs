//! Sources API endpoints.
//!
//! Thin pass-through to the sources inventory, scoped to the sources
//! usable for provisioning.

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use tracing::error;

use crate::api::error::ApiError;
use crate::api::request_context::RequestContext;
use crate::clients::{Source, Sources, SourcesError};
use crate::state::AppState;

/// Create sources routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(list_sources))
}

/// Response for listing provisioning sources.
#[derive(Debug, Serialize)]
pub struct ListSourcesResponse {
    /// List of sources.
    pub items: Vec<Source>,
}

/// List the sources associated with the provisioning application type.
///
/// GET /v1/sources
async fn list_sources(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<impl IntoResponse, ApiError> {
    let request_id = ctx.request_id;

    match state.sources().list_provisioning_sources().await {
        Ok(items) => Ok(Json(ListSourcesResponse { items })),
        Err(err) => {
            let api_error = match &err {
                SourcesError::SourceNotFound | SourcesError::ApplicationTypeNotFound => {
                    ApiError::not_found("source_not_found", "No provisioning sources found")
                }
                SourcesError::AuthenticationNotFound
                | SourcesError::ApplicationNotFound
                | SourcesError::MoreThanOneAuthentication { .. }
                | SourcesError::MissingAuthentication { .. }
                | SourcesError::MalformedAuthentication { .. }
                | SourcesError::AuthenticationSourceAssociation { .. }
                | SourcesError::UnexpectedStatus { .. }
                | SourcesError::Transport { .. }
                | SourcesError::Initialization(_) => {
                    error!(error = %err, request_id = %request_id, "Failed to list sources");
                    ApiError::internal("sources_error", "Failed to list sources")
                }
            };
            Err(api_error.with_request_id(request_id))
        }
    }
}
