//! Application state shared across request handlers.

use std::sync::Arc;

use crate::clients::{ImageBuilder, Sources};
use crate::db::Database;
use crate::jobs::JobQueue;
use crate::orchestrator::ReservationOrchestrator;

/// Shared application state.
///
/// This is passed to all request handlers via Axum's state extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    db: Database,
    sources: Arc<dyn Sources>,
    orchestrator: ReservationOrchestrator,
}

impl AppState {
    /// Create a new application state and wire up the orchestrator.
    pub fn new(
        db: Database,
        sources: Arc<dyn Sources>,
        image_builder: Arc<dyn ImageBuilder>,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        let orchestrator = ReservationOrchestrator::new(
            Arc::new(db.pubkey_store()),
            Arc::new(db.reservation_store()),
            Arc::clone(&sources),
            image_builder,
            queue,
        );
        Self {
            inner: Arc::new(AppStateInner {
                db,
                sources,
                orchestrator,
            }),
        }
    }

    /// Get a reference to the database.
    pub fn db(&self) -> &Database {
        &self.inner.db
    }

    /// Get a reference to the sources client.
    pub fn sources(&self) -> &Arc<dyn Sources> {
        &self.inner.sources
    }

    /// Get a reference to the reservation orchestrator.
    pub fn orchestrator(&self) -> &ReservationOrchestrator {
        &self.inner.orchestrator
    }
}
