//! SiteHost API server

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use sitehost_api::config::{Config, LogFormat, MappingStoreKind};
use sitehost_api::mappings::{MappingStore, MemoryMappingStore, PgMappingStore};
use sitehost_api::routes::create_router;
use sitehost_api::routing::cache::cleanup_task;
use sitehost_api::state::AppState;
use sitehost_api::telemetry::init_logging;
use sitehost_shared::{create_pool, run_migrations};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging(LogFormat::from_env());

    let config = Config::from_env().context("failed to load configuration")?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.bind_address,
        store = ?config.mapping_store,
        site_prefix = %config.site_prefix,
        "sitehost-api starting"
    );

    let store: Arc<dyn MappingStore> = match config.mapping_store {
        MappingStoreKind::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for the postgres mapping store")?;
            let pool = create_pool(database_url, config.database_max_connections)
                .await
                .context("failed to connect to the database")?;
            run_migrations(&pool).await.context("failed to run migrations")?;
            Arc::new(PgMappingStore::new(pool))
        }
        MappingStoreKind::Memory => {
            tracing::warn!("Using the in-memory mapping store; mappings are lost on restart");
            Arc::new(MemoryMappingStore::new())
        }
    };

    let bind_address = config.bind_address.clone();
    let state = AppState::new(config, store).context("failed to compile platform routes")?;
    tokio::spawn(cleanup_task(state.resolver.cache()));
    let app = create_router(state);

    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {}", bind_address))?;
    tracing::info!(address = %listener.local_addr()?, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
