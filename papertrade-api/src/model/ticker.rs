//! Price feed models.
//!
//! `RawTick` is what the exchange feed delivers; `Ticker` is the persisted
//! time-series point with synthetic bid/ask derived by the ingestion
//! pipeline. Tickers are append-only and immutable once written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A raw trade event as delivered by the upstream exchange feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTick {
    pub symbol: String,
    pub trade_price: f64,
    pub quantity: f64,
    /// Event time in milliseconds since the Unix epoch.
    pub event_time: i64,
}

impl RawTick {
    pub fn new(symbol: impl Into<String>, trade_price: f64, quantity: f64, event_time: i64) -> Self {
        Self {
            symbol: symbol.into(),
            trade_price,
            quantity,
            event_time,
        }
    }
}

/// A persisted price-history point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticker {
    pub time: DateTime<Utc>,
    pub symbol: String,
    pub trade_price: f64,
    pub bid_price: f64,
    pub ask_price: f64,
    pub volume: f64,
}

impl Ticker {
    pub fn new(
        time: DateTime<Utc>,
        symbol: impl Into<String>,
        trade_price: f64,
        bid_price: f64,
        ask_price: f64,
        volume: f64,
    ) -> Self {
        Self {
            time,
            symbol: symbol.into(),
            trade_price,
            bid_price,
            ask_price,
            volume,
        }
    }
}
