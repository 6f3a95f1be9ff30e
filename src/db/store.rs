use sqlx::SqlitePool;

use crate::db::models::SnapshotRow;
use crate::error::Result;
use crate::types::PriceSnapshot;

/// Append-only snapshot persistence. `append`, `latest`, and `recent` are
/// the whole storage contract; nothing else in the process touches SQL.
#[derive(Clone)]
pub struct SnapshotStore {
    pool: SqlitePool,
}

impl SnapshotStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Bulk insert one poll cycle's batch inside a single transaction.
    /// Snapshots are never updated or deleted afterwards; repeated cycles
    /// append new rows even when values are unchanged.
    pub async fn append(&self, batch: &[PriceSnapshot]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for snapshot in batch {
            sqlx::query(
                r#"
                INSERT INTO snapshots (coin, price, market_cap, h24_change, timestamp)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&snapshot.coin)
            .bind(snapshot.price)
            .bind(snapshot.market_cap)
            .bind(snapshot.h24_change)
            .bind(snapshot.timestamp)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// The snapshot with the greatest timestamp for `coin`, or None if the
    /// coin has never been fetched. Rows within one batch share a timestamp;
    /// rowid breaks the tie so the result is deterministic.
    pub async fn latest(&self, coin: &str) -> Result<Option<SnapshotRow>> {
        let row = sqlx::query_as::<_, SnapshotRow>(
            r#"
            SELECT id, coin, price, market_cap, h24_change, timestamp
            FROM snapshots
            WHERE coin = ?
            ORDER BY timestamp DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(coin)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// The `limit` most recent snapshots for `coin`, newest first.
    pub async fn recent(&self, coin: &str, limit: i64) -> Result<Vec<SnapshotRow>> {
        let rows = sqlx::query_as::<_, SnapshotRow>(
            r#"
            SELECT id, coin, price, market_cap, h24_change, timestamp
            FROM snapshots
            WHERE coin = ?
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(coin)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn snap(coin: &str, price: f64, timestamp: i64) -> PriceSnapshot {
        PriceSnapshot {
            coin: coin.to_string(),
            price,
            market_cap: price * 1e9,
            h24_change: 0.5,
            timestamp,
        }
    }

    #[tokio::test]
    async fn latest_returns_none_for_unknown_coin() {
        let store = memory_store().await;
        assert!(store.latest("bitcoin").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn latest_returns_greatest_timestamp() {
        let store = memory_store().await;
        store
            .append(&[snap("bitcoin", 100.0, 1_000), snap("bitcoin", 110.0, 2_000)])
            .await
            .unwrap();
        store.append(&[snap("bitcoin", 105.0, 1_500)]).await.unwrap();

        let latest = store.latest("bitcoin").await.unwrap().unwrap();
        assert_eq!(latest.timestamp, 2_000);
        assert_eq!(latest.price, 110.0);
    }

    #[tokio::test]
    async fn latest_is_scoped_per_coin() {
        let store = memory_store().await;
        store
            .append(&[snap("bitcoin", 100.0, 1_000), snap("ethereum", 50.0, 1_000)])
            .await
            .unwrap();

        let latest = store.latest("ethereum").await.unwrap().unwrap();
        assert_eq!(latest.coin, "ethereum");
        assert_eq!(latest.price, 50.0);
    }

    #[tokio::test]
    async fn recent_orders_newest_first_and_honors_limit() {
        let store = memory_store().await;
        for i in 0..5i64 {
            store
                .append(&[snap("bitcoin", 100.0 + i as f64, 1_000 + i)])
                .await
                .unwrap();
        }

        let rows = store.recent("bitcoin", 3).await.unwrap();
        assert_eq!(rows.len(), 3);
        let timestamps: Vec<i64> = rows.iter().map(|r| r.timestamp).collect();
        assert_eq!(timestamps, vec![1_004, 1_003, 1_002]);
    }

    #[tokio::test]
    async fn recent_breaks_timestamp_ties_by_insertion_order() {
        let store = memory_store().await;
        // Two batches sharing a timestamp; the later insert wins the tie.
        store.append(&[snap("bitcoin", 100.0, 1_000)]).await.unwrap();
        store.append(&[snap("bitcoin", 200.0, 1_000)]).await.unwrap();

        let rows = store.recent("bitcoin", 10).await.unwrap();
        assert_eq!(rows[0].price, 200.0);
        assert_eq!(rows[1].price, 100.0);
    }

    #[tokio::test]
    async fn append_is_all_or_nothing_per_batch() {
        let store = memory_store().await;
        store
            .append(&[snap("bitcoin", 100.0, 1_000), snap("ethereum", 50.0, 1_000)])
            .await
            .unwrap();

        // Both rows of the batch landed.
        assert!(store.latest("bitcoin").await.unwrap().is_some());
        assert!(store.latest("ethereum").await.unwrap().is_some());
    }
}
