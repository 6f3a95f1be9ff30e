use crate::error::{AppError, Result};

pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

/// Coins tracked when COINS is not set.
pub const DEFAULT_COINS: &str = "bitcoin,matic-network,ethereum";

/// Poll cadence in seconds (FETCH_INTERVAL_SECS). The upstream refreshes
/// slowly enough that two hours between batches loses nothing.
pub const DEFAULT_FETCH_INTERVAL_SECS: u64 = 7_200;

/// Request timeout for the CoinGecko client (seconds).
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// How many of the most recent snapshots the deviation query considers.
pub const DEVIATION_WINDOW: i64 = 100;

/// Minimum samples required before a deviation is meaningful.
pub const MIN_DEVIATION_SAMPLES: usize = 2;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Coin identifiers polled each cycle (COINS, comma-separated).
    /// Example: "bitcoin,matic-network,ethereum"
    pub coins: Vec<String>,
    /// Seconds between poll cycles (FETCH_INTERVAL_SECS).
    pub fetch_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let coins: Vec<String> = std::env::var("COINS")
            .unwrap_or_else(|_| DEFAULT_COINS.to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if coins.is_empty() {
            return Err(AppError::Config(
                "COINS must name at least one coin".to_string(),
            ));
        }

        Ok(Self {
            api_url: std::env::var("COINGECKO_API_URL")
                .unwrap_or_else(|_| COINGECKO_API_URL.to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "tracker.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| {
                    AppError::Config("API_PORT must be a valid port number".to_string())
                })?,
            fetch_interval_secs: std::env::var("FETCH_INTERVAL_SECS")
                .unwrap_or_else(|_| DEFAULT_FETCH_INTERVAL_SECS.to_string())
                .parse::<u64>()
                .unwrap_or(DEFAULT_FETCH_INTERVAL_SECS),
            coins,
        })
    }
}
