use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::config::{Config, HTTP_TIMEOUT_SECS};
use crate::error::{AppError, Result};
use crate::types::PriceSnapshot;

/// Build the shared CoinGecko client. One client for the process lifetime so
/// connection pooling works across poll cycles.
pub fn build_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()
        .map_err(AppError::from)
}

/// Fetch current prices for all configured coins in one batched request.
///
/// The whole batch shares a single timestamp and is all-or-nothing: any
/// upstream failure, missing coin, or malformed field aborts the cycle with
/// no snapshots produced. Partial batches are never written.
pub async fn fetch_prices(client: &reqwest::Client, cfg: &Config) -> Result<Vec<PriceSnapshot>> {
    let url = format!("{}/simple/price", cfg.api_url);
    let ids = cfg.coins.join(",");

    debug!(url = %url, ids = %ids, "fetching prices");

    let resp = client
        .get(&url)
        .query(&[
            ("ids", ids.as_str()),
            ("vs_currencies", "usd"),
            ("include_market_cap", "true"),
            ("include_24hr_change", "true"),
        ])
        .send()
        .await?
        .error_for_status()?;

    let body: serde_json::Value = resp.json().await?;
    snapshots_from_response(&cfg.coins, &body, now_ms())
}

/// Turn a decoded /simple/price response into one snapshot per requested
/// coin. The upstream keys the object by coin id, each entry carrying
/// `usd`, `usd_market_cap`, and `usd_24h_change`.
pub fn snapshots_from_response(
    coins: &[String],
    body: &serde_json::Value,
    timestamp: i64,
) -> Result<Vec<PriceSnapshot>> {
    let entries = body.as_object().ok_or_else(|| {
        AppError::Upstream("price response was not a JSON object".to_string())
    })?;

    let mut batch = Vec::with_capacity(coins.len());
    for coin in coins {
        let entry = entries.get(coin.as_str()).ok_or_else(|| {
            AppError::Upstream(format!("coin {coin} missing from price response"))
        })?;

        batch.push(PriceSnapshot {
            coin: coin.clone(),
            price: field_f64(entry, "usd", coin)?,
            market_cap: field_f64(entry, "usd_market_cap", coin)?,
            h24_change: field_f64(entry, "usd_24h_change", coin)?,
            timestamp,
        });
    }

    Ok(batch)
}

fn field_f64(entry: &serde_json::Value, field: &str, coin: &str) -> Result<f64> {
    entry
        .get(field)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| {
            AppError::Upstream(format!("{field} missing or not a number for coin {coin}"))
        })
}

pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
