//! Provisioning API server.
//!
//! Accepts reservation requests for cloud compute instances, resolves
//! the launch credential through the sources inventory, and schedules
//! the background jobs that carry out the launch.

use std::sync::Arc;

use anyhow::Result;
use provisioning_api::{
    api,
    cache::AppTypeCache,
    clients::{ImageBuilderClient, SourcesClient},
    config,
    db::Database,
    jobs::PgJobQueue,
    state::AppState,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = config::Config::from_env()?;

    // Initialize tracing (prefer RUST_LOG, fallback to PROV_LOG_LEVEL)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting provisioning API");
    info!(listen_addr = %config.listen_addr, "Configuration loaded");

    // Connect to database
    let db = match Database::connect(&config.database).await {
        Ok(db) => {
            info!("Database connection established");
            db
        }
        Err(e) => {
            error!(error = %e, "Failed to connect to database");
            return Err(e.into());
        }
    };

    // Run migrations in dev mode
    if config.dev_mode {
        info!("Running database migrations (dev mode)");
        if let Err(e) = db.run_migrations().await {
            error!(error = %e, "Failed to run migrations");
            return Err(e.into());
        }
    }

    // Upstream clients share one app type cache for the process lifetime
    let app_type_cache = Arc::new(AppTypeCache::new());
    let sources = Arc::new(SourcesClient::new(&config.sources, app_type_cache)?);
    let image_builder = Arc::new(ImageBuilderClient::new(&config.image_builder)?);
    let queue = Arc::new(PgJobQueue::new(db.pool().clone()));

    // Create application state
    let state = AppState::new(db, sources, image_builder, queue);

    // Build and run the server
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "Listening for connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received shutdown signal");
        })
        .await?;

    info!("Provisioning API shutdown complete");
    Ok(())
}
