//! Database row types for the snapshots table.
//! Used by sqlx for typed queries.

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SnapshotRow {
    pub id: i64,
    pub coin: String,
    pub price: f64,
    pub market_cap: f64,
    pub h24_change: f64,
    pub timestamp: i64,
}
