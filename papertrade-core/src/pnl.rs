//! Periodic unrealized-PnL snapshots.
//!
//! For every known account, publishes a live valuation of the open book on
//! a fixed interval. Pure observability fan-out: nothing downstream of the
//! bus is the system of record.

use std::sync::Arc;

use log::info;

use crate::bus::{EngineEvent, EventBus};
use crate::config::EngineConfig;
use crate::engine::TradeEngine;
use crate::ledger::AccountLedger;

pub struct PnlSnapshotWorker {
    engine: Arc<TradeEngine>,
    ledger: Arc<AccountLedger>,
    bus: EventBus,
    config: EngineConfig,
}

impl PnlSnapshotWorker {
    pub fn new(
        engine: Arc<TradeEngine>,
        ledger: Arc<AccountLedger>,
        bus: EventBus,
        config: EngineConfig,
    ) -> Self {
        Self {
            engine,
            ledger,
            bus,
            config,
        }
    }

    pub async fn run(self) {
        info!(
            "unrealized pnl worker started, publishing every {}ms",
            self.config.pnl_interval_ms
        );
        let mut timer = tokio::time::interval(self.config.pnl_interval());
        loop {
            timer.tick().await;
            self.publish_snapshots();
        }
    }

    /// Publishes one snapshot per user. Users with no open trades publish
    /// an empty book, which downstream consumers use to clear stale rows.
    pub fn publish_snapshots(&self) {
        for user_id in self.ledger.user_ids() {
            let positions = self.engine.unrealized_pnl_for_user(user_id);
            self.bus.publish(EngineEvent::UnrealizedPnl { user_id, positions });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PriceCache;
    use crate::store::TradeStore;
    use papertrade::model::trade::{Side, Trade, TradeRequest};

    #[tokio::test]
    async fn snapshots_cover_every_account() {
        let store = Arc::new(TradeStore::new());
        let ledger = Arc::new(AccountLedger::new());
        let cache = Arc::new(PriceCache::new());
        let engine = Arc::new(TradeEngine::new(
            Arc::clone(&store),
            Arc::clone(&ledger),
            Arc::clone(&cache),
        ));
        let bus = EventBus::new(16);

        ledger.ensure_account(1, 5_000.0);
        ledger.ensure_account(2, 5_000.0);
        cache.set("BTCUSDT", 51_000.0);
        let request = TradeRequest::new(Side::Buy, "BTCUSDT", 0.01).unwrap();
        store.insert_trade(Trade::open(1, &request, 50_000.0, 500.0));

        let worker = PnlSnapshotWorker::new(
            engine,
            Arc::clone(&ledger),
            bus.clone(),
            EngineConfig::default(),
        );
        let mut events = bus.subscribe();
        worker.publish_snapshots();

        let mut seen = Vec::new();
        for _ in 0..2 {
            match events.recv().await.unwrap() {
                EngineEvent::UnrealizedPnl { user_id, positions } => {
                    if user_id == 1 {
                        assert_eq!(positions.len(), 1);
                        assert_eq!(positions[0].unrealized_pnl, Some(10.0));
                    } else {
                        assert!(positions.is_empty());
                    }
                    seen.push(user_id);
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 2]);
    }
}
