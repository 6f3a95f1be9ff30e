//! Shared health state for the /health endpoint.
//! Updated by the poller, read by the API.

use std::sync::atomic::{AtomicU64, Ordering};

/// Poller telemetry. Written once per poll cycle, read on every /health
/// request; Relaxed ordering is enough for counters nobody sequences on.
#[derive(Default)]
pub struct HealthState {
    /// Millisecond timestamp of the last successful fetch cycle (0 = none).
    pub last_fetch_at_ms: AtomicU64,
    /// Completed fetch cycles that appended a batch.
    pub fetch_cycles_ok: AtomicU64,
    /// Fetch cycles aborted by an upstream or storage error.
    pub fetch_cycles_failed: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, at_ms: u64) {
        self.last_fetch_at_ms.store(at_ms, Ordering::Relaxed);
        self.fetch_cycles_ok.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.fetch_cycles_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn last_fetch_at_ms(&self) -> u64 {
        self.last_fetch_at_ms.load(Ordering::Relaxed)
    }

    pub fn fetch_cycles_ok(&self) -> u64 {
        self.fetch_cycles_ok.load(Ordering::Relaxed)
    }

    pub fn fetch_cycles_failed(&self) -> u64 {
        self.fetch_cycles_failed.load(Ordering::Relaxed)
    }
}
