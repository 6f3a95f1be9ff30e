use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// PriceSnapshot
// ---------------------------------------------------------------------------

/// One point-in-time record of a coin's price, market cap, and 24h change.
/// Immutable once written; every poll cycle appends a fresh batch, one
/// snapshot per configured coin, all sharing the batch timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSnapshot {
    pub coin: String,
    /// Unit price in USD.
    pub price: f64,
    /// Market capitalization in USD.
    pub market_cap: f64,
    /// Percent change over the trailing 24 hours.
    pub h24_change: f64,
    /// Unix epoch milliseconds, set when the batch was fetched.
    pub timestamp: i64,
}
