mod api;
mod config;
mod db;
mod error;
mod fetcher;
mod poller;
mod stats;
mod types;

use std::sync::Arc;

use sqlx::sqlite::SqliteConnectOptions;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::health::HealthState;
use crate::api::routes::{router, ApiState};
use crate::config::Config;
use crate::db::SnapshotStore;
use crate::error::Result;
use crate::poller::PricePoller;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let opts = SqliteConnectOptions::new()
        .filename(&cfg.db_path)
        .create_if_missing(true);
    let pool = sqlx::SqlitePool::connect_with(opts).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database ready at {}", cfg.db_path);

    let store = SnapshotStore::new(pool);
    let health = Arc::new(HealthState::new());
    let client = fetcher::build_client()?;

    let poller = PricePoller::new(
        cfg.clone(),
        store.clone(),
        Arc::clone(&health),
        client,
    );

    // Immediate population — the first interval tick is hours away.
    if let Err(e) = poller.run_once().await {
        warn!("Startup fetch failed, store stays empty until the next cycle: {e}");
    }

    // --- Background poller ---
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move { poller.run(shutdown_rx).await });
    info!(
        "Polling {} coins every {}s: {}",
        cfg.coins.len(),
        cfg.fetch_interval_secs,
        cfg.coins.join(", "),
    );

    // --- HTTP API server ---
    let api_state = ApiState { store, health };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Server is down; stop the poller too.
    let _ = shutdown_tx.send(true);
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
    }
}
