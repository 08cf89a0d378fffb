//! API v1 routes.

mod reservations;
mod sources;

use axum::Router;

use crate::state::AppState;

/// Create API v1 routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/reservations", reservations::routes())
        .nest("/sources", sources::routes())
}
