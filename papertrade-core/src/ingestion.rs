//! Raw-tick ingestion.
//!
//! Drains the raw-tick queue in non-blocking batches, derives synthetic
//! bid/ask around each trade price, publishes one price-update event per
//! tick and persists the whole batch in a single store call. When the
//! queue is empty the pipeline sleeps a short fixed interval instead of
//! spinning.
//!
//! Bid/ask convention: `bid = trade_price * (1 - spread)` and
//! `ask = trade_price * (1 + spread)`, applied consistently everywhere.
//! The cache holds the ask side, so admission prices opens at the
//! synthetic offer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use papertrade::model::ticker::{RawTick, Ticker};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::bus::{EngineEvent, EventBus};
use crate::cache::PriceCache;
use crate::config::EngineConfig;
use crate::queue::TickDrain;
use crate::store::TradeStore;

pub struct TickerIngestionPipeline {
    ticks: TickDrain,
    store: Arc<TradeStore>,
    bus: EventBus,
    config: EngineConfig,
}

impl TickerIngestionPipeline {
    pub fn new(ticks: TickDrain, store: Arc<TradeStore>, bus: EventBus, config: EngineConfig) -> Self {
        Self {
            ticks,
            store,
            bus,
            config,
        }
    }

    /// Runs the ingestion loop for the lifetime of the process.
    pub async fn run(mut self) {
        info!(
            "ticker ingestion started: batch size {}, spread {}",
            self.config.tick_batch_size, self.config.spread
        );
        loop {
            if self.run_once() == 0 {
                tokio::time::sleep(self.config.idle_backoff()).await;
            }
        }
    }

    /// Processes at most one batch, returning the number of ticks handled.
    /// Never blocks: an empty queue simply yields zero.
    pub fn run_once(&mut self) -> usize {
        let batch = self.ticks.drain(self.config.tick_batch_size);
        if batch.is_empty() {
            return 0;
        }

        let tickers: Vec<Ticker> = batch.iter().map(|tick| self.process_tick(tick)).collect();
        info!("inserting batch of {} tickers", tickers.len());
        self.store.insert_tickers(&tickers);
        tickers.len()
    }

    /// Publishes the normalized price update for one tick and returns the
    /// row to persist.
    fn process_tick(&self, tick: &RawTick) -> Ticker {
        let bid = tick.trade_price * (1.0 - self.config.spread);
        let ask = tick.trade_price * (1.0 + self.config.spread);

        self.bus.publish(EngineEvent::PriceUpdate {
            symbol: tick.symbol.clone(),
            bid,
            ask,
            trade_price: tick.trade_price,
            trade_time: tick.event_time,
        });

        let time = DateTime::from_timestamp_millis(tick.event_time).unwrap_or_else(Utc::now);
        Ticker::new(time, tick.symbol.clone(), tick.trade_price, bid, ask, tick.quantity)
    }
}

/// Consumes price-update events off the bus and keeps the cache current.
///
/// Runs in the same process as the pipeline; the cache stores the ask
/// side as the reference price for admission. Takes an already-subscribed
/// receiver so that events published between wiring and the task's first
/// poll are not lost.
pub async fn run_price_listener(
    mut events: broadcast::Receiver<EngineEvent>,
    cache: Arc<PriceCache>,
) {
    loop {
        match events.recv().await {
            Ok(EngineEvent::PriceUpdate { symbol, ask, .. }) => {
                debug!("updating cached price for {symbol}: {ask}");
                cache.set(&symbol, ask);
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                warn!("price listener lagged, skipped {skipped} events");
            }
            Err(RecvError::Closed) => {
                info!("event bus closed, price listener stopping");
                break;
            }
        }
    }
}
