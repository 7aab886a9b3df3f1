//! # Event Bus
//!
//! Best-effort fan-out of price updates, trade lifecycle events and PnL
//! snapshots to downstream consumers (UI push layers, analytics, the
//! in-process price listener).
//!
//! The bus is never the system of record: every state-changing fact is
//! durably committed before its event is published, and a dropped or
//! lagged event loses nothing but freshness.

use papertrade::model::account::PositionPnl;
use papertrade::model::trade::TradeRequest;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Everything the engine announces to the outside world.
#[derive(Debug, Clone, Serialize)]
pub enum EngineEvent {
    /// **Ingestion**: a normalized price update, one per processed tick.
    PriceUpdate {
        symbol: String,
        bid: f64,
        ask: f64,
        trade_price: f64,
        /// Exchange event time in milliseconds since the Unix epoch.
        trade_time: i64,
    },

    /// **Order worker**: a queued trade request was committed.
    TradeSuccess {
        user_id: u64,
        order_id: Uuid,
        request: TradeRequest,
    },

    /// **Order worker**: all attempts for a queued request failed; this
    /// event is the only record of the discarded job.
    TradeFailure {
        user_id: u64,
        reason: String,
        request: TradeRequest,
    },

    /// **PnL worker**: a live valuation snapshot of a user's open book.
    UnrealizedPnl {
        user_id: u64,
        positions: Vec<PositionPnl>,
    },
}

/// A wrapper around a tokio broadcast channel.
///
/// Wrapped in a struct to enforce strong typing on the events and to keep
/// the transport swappable behind one seam.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    /// Creates a bus with the given buffer capacity. Subscribers that fall
    /// more than `capacity` events behind skip ahead (lagging).
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all current subscribers.
    pub fn publish(&self, event: EngineEvent) {
        // No active subscribers is not an error, e.g. during startup.
        let _ = self.sender.send(event);
    }

    /// Creates a new subscriber receiving every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_all_subscribers() {
        let bus = EventBus::new(16);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        bus.publish(EngineEvent::PriceUpdate {
            symbol: "BTCUSDT".into(),
            bid: 49_500.0,
            ask: 50_500.0,
            trade_price: 50_000.0,
            trade_time: 0,
        });

        for rx in [&mut first, &mut second] {
            match rx.recv().await.unwrap() {
                EngineEvent::PriceUpdate { symbol, ask, .. } => {
                    assert_eq!(symbol, "BTCUSDT");
                    assert_eq!(ask, 50_500.0);
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
    }

    #[test]
    fn events_serialize_for_external_fanout() {
        let event = EngineEvent::PriceUpdate {
            symbol: "BTCUSDT".into(),
            bid: 49_500.0,
            ask: 50_500.0,
            trade_price: 50_000.0,
            trade_time: 1_700_000_000_000,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("PriceUpdate"));
        assert!(json.contains("BTCUSDT"));
    }

    #[test]
    fn publish_without_subscribers_is_a_noop() {
        let bus = EventBus::new(4);
        bus.publish(EngineEvent::UnrealizedPnl {
            user_id: 1,
            positions: Vec::new(),
        });
    }
}
