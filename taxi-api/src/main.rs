//! # Taxi API Server
//!
//! ```bash
//! STORAGE_BACKEND=memory JWT_SECRET=$(openssl rand -hex 32) cargo run -p taxi-api
//! ```

use std::sync::Arc;

use anyhow::Context;
use taxi_api::{
    app::{build_router, AppState},
    config::{Config, LogFormat, StorageBackend},
};
use taxi_shared::{
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, PoolConfig},
    },
    store::{memory::MemoryStore, postgres::PgFleetStore, FleetStore},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "taxi_api=debug,taxi_shared=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    tracing::info!("Taxi API Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut pool = None;
    let store: Arc<dyn FleetStore> = match config.storage.backend {
        StorageBackend::Postgres => {
            let url = config
                .storage
                .database_url
                .clone()
                .context("DATABASE_URL environment variable is required")?;
            let db = create_pool(PoolConfig {
                url,
                max_connections: config.storage.max_connections,
                ..Default::default()
            })
            .await
            .context("Failed to connect to database")?;
            run_migrations(&db).await.context("Failed to run migrations")?;

            pool = Some(db.clone());
            Arc::new(PgFleetStore::new(db))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; records are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let address = config.bind_address();
    let app = build_router(AppState::new(store, config));

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    tracing::info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pool) = pool {
        close_pool(pool).await;
    }
    tracing::info!("Server stopped");
    Ok(())
}
