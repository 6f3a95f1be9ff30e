use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::interval;
use tracing::{error, info};

use crate::api::health::HealthState;
use crate::config::Config;
use crate::db::SnapshotStore;
use crate::error::Result;
use crate::fetcher::{fetch_prices, now_ms};

/// Scheduler component driving the fetch-and-append cycle. Owns its own
/// ticker and lifecycle; the process holds no timer state outside this
/// struct. A failed cycle is terminal for that cycle only — logged, counted,
/// and the loop waits for the next tick. No retry is scheduled.
pub struct PricePoller {
    cfg: Config,
    store: SnapshotStore,
    health: Arc<HealthState>,
    client: reqwest::Client,
}

impl PricePoller {
    pub fn new(
        cfg: Config,
        store: SnapshotStore,
        health: Arc<HealthState>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            cfg,
            store,
            health,
            client,
        }
    }

    /// Poll on the configured interval until `shutdown` fires.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(Duration::from_secs(self.cfg.fetch_interval_secs));
        ticker.tick().await; // skip immediate first tick — startup fetch already ran

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        error!("Price fetch cycle failed: {e}");
                    }
                }
                _ = shutdown.changed() => {
                    info!("Price poller stopping");
                    return;
                }
            }
        }
    }

    /// One fetch-and-append cycle. Also invoked directly at startup so the
    /// store is populated before the first interval elapses.
    pub async fn run_once(&self) -> Result<()> {
        match self.poll_cycle().await {
            Ok(count) => {
                self.health.record_success(now_ms() as u64);
                info!(coins = count, "Price fetch cycle complete");
                Ok(())
            }
            Err(e) => {
                self.health.record_failure();
                Err(e)
            }
        }
    }

    async fn poll_cycle(&self) -> Result<usize> {
        let batch = fetch_prices(&self.client, &self.cfg).await?;
        self.store.append(&batch).await?;
        Ok(batch.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::build_client;

    async fn memory_store() -> SnapshotStore {
        // One connection only — every pooled connection to :memory: would
        // otherwise open its own empty database.
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("migrations");
        SnapshotStore::new(pool)
    }

    fn test_config(api_url: &str) -> Config {
        Config {
            api_url: api_url.to_string(),
            log_level: "info".to_string(),
            db_path: ":memory:".to_string(),
            api_port: 0,
            coins: vec!["bitcoin".to_string()],
            fetch_interval_secs: 3_600,
        }
    }

    #[tokio::test]
    async fn failed_cycle_appends_nothing_and_counts_a_failure() {
        // Nothing listens on port 1; the fetch fails before any write.
        let cfg = test_config("http://127.0.0.1:1");
        let store = memory_store().await;
        let health = Arc::new(HealthState::new());
        let poller = PricePoller::new(
            cfg,
            store.clone(),
            Arc::clone(&health),
            build_client().unwrap(),
        );

        assert!(poller.run_once().await.is_err());
        assert!(store.latest("bitcoin").await.unwrap().is_none());
        assert_eq!(health.fetch_cycles_failed(), 1);
        assert_eq!(health.fetch_cycles_ok(), 0);
        assert_eq!(health.last_fetch_at_ms(), 0);
    }
}
