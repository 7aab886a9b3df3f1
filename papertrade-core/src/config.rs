//! Engine configuration.
//!
//! Every policy constant in one place, serde-deserializable so a service
//! wrapper can load it from a file and tests can shrink the intervals.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Relative spread applied to the trade price when deriving bid/ask:
    /// bid = price * (1 - spread), ask = price * (1 + spread).
    pub spread: f64,
    /// Maximum raw ticks drained from the queue per ingestion cycle.
    pub tick_batch_size: usize,
    /// Sleep between ingestion cycles when the tick queue is empty.
    pub idle_backoff_ms: u64,
    /// Attempts the order worker makes per job before giving up.
    pub max_open_attempts: u32,
    /// Pause between order worker attempts.
    pub retry_delay_ms: u64,
    /// Interval between liquidation scans.
    pub liquidation_interval_ms: u64,
    /// Interval between unrealized-PnL snapshots.
    pub pnl_interval_ms: u64,
    /// Capacity of the raw-tick queue; a full queue blocks the feed.
    pub tick_queue_capacity: usize,
    /// Capacity of the trade-job queue.
    pub job_queue_capacity: usize,
    /// Capacity of the broadcast event bus; slow subscribers lag.
    pub event_capacity: usize,
    /// Balance seeded into newly created accounts.
    pub seed_balance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            spread: 0.01,
            tick_batch_size: 50,
            idle_backoff_ms: 100,
            max_open_attempts: 3,
            retry_delay_ms: 500,
            liquidation_interval_ms: 5_000,
            pnl_interval_ms: 5_000,
            tick_queue_capacity: 1_024,
            job_queue_capacity: 256,
            event_capacity: 256,
            seed_balance: 5_000.0,
        }
    }
}

impl EngineConfig {
    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn liquidation_interval(&self) -> Duration {
        Duration::from_millis(self.liquidation_interval_ms)
    }

    pub fn pnl_interval(&self) -> Duration {
        Duration::from_millis(self.pnl_interval_ms)
    }
}
