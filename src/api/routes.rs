use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::health::HealthState;
use crate::config::{DEVIATION_WINDOW, MIN_DEVIATION_SAMPLES};
use crate::db::SnapshotStore;
use crate::error::AppError;
use crate::stats::{population_std_dev, round2};

#[derive(Clone)]
pub struct ApiState {
    pub store: SnapshotStore,
    pub health: Arc<HealthState>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/stats", get(get_stats))
        .route("/deviation", get(get_deviation))
        .route("/health", get(get_health))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CoinQuery {
    pub coin: Option<String>,
}

impl CoinQuery {
    /// The required coin id, or InvalidArgument when missing or empty.
    fn required_coin(self) -> Result<String, AppError> {
        self.coin
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AppError::InvalidArgument("coin query parameter is required".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub price: f64,
    pub market_cap: f64,
    pub h24_change: f64,
}

#[derive(Debug, Serialize)]
pub struct DeviationResponse {
    pub deviation: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub last_fetch_at_ms: u64,
    pub fetch_cycles_ok: u64,
    pub fetch_cycles_failed: u64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Latest stored snapshot for a coin.
async fn get_stats(
    State(state): State<ApiState>,
    Query(params): Query<CoinQuery>,
) -> Result<Json<StatsResponse>, AppError> {
    let coin = params.required_coin()?;

    let row = state
        .store
        .latest(&coin)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no data found for coin {coin}")))?;

    Ok(Json(StatsResponse {
        price: row.price,
        market_cap: row.market_cap,
        h24_change: row.h24_change,
    }))
}

/// Population standard deviation of the price over the last 100 snapshots.
/// Samples are weighted equally no matter how far apart they were taken.
async fn get_deviation(
    State(state): State<ApiState>,
    Query(params): Query<CoinQuery>,
) -> Result<Json<DeviationResponse>, AppError> {
    let coin = params.required_coin()?;

    let rows = state.store.recent(&coin, DEVIATION_WINDOW).await?;
    if rows.len() < MIN_DEVIATION_SAMPLES {
        return Err(AppError::InsufficientData(format!(
            "need at least {MIN_DEVIATION_SAMPLES} snapshots for coin {coin} to compute deviation"
        )));
    }

    let prices: Vec<f64> = rows.iter().map(|r| r.price).collect();
    let deviation = round2(population_std_dev(&prices));

    Ok(Json(DeviationResponse { deviation }))
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        last_fetch_at_ms: state.health.last_fetch_at_ms(),
        fetch_cycles_ok: state.health.fetch_cycles_ok(),
        fetch_cycles_failed: state.health.fetch_cycles_failed(),
    })
}
