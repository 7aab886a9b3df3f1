//! The liquidation monitor.
//!
//! A fixed-interval scan over every open trade, valuing each against the
//! price cache and force-closing the ones that hit a risk rule. Rules are
//! evaluated in a fixed priority per trade (take-profit, then stop-loss,
//! then margin exhaustion) and only the first match fires in a pass.
//! A symbol with no cached price is skipped for the cycle, and one trade's
//! failure never aborts the rest of the scan.

use std::sync::Arc;

use log::{info, warn};
use papertrade::model::trade::{Side, Trade, TradeStatus};
use tokio::time::MissedTickBehavior;

use crate::cache::PriceCache;
use crate::config::EngineConfig;
use crate::engine::TradeEngine;

/// Which risk rule fired for a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseTrigger {
    TakeProfit,
    StopLoss,
    /// Losses have consumed the entire committed margin.
    MarginExhausted,
}

impl CloseTrigger {
    /// Terminal status recorded for a trade closed by this trigger.
    fn status(self) -> TradeStatus {
        match self {
            CloseTrigger::TakeProfit | CloseTrigger::StopLoss => TradeStatus::Closed,
            CloseTrigger::MarginExhausted => TradeStatus::Liquidated,
        }
    }
}

/// Evaluates the risk rules for one trade at the given reference price.
///
/// Take-profit triggers when the price has reached-or-passed the target in
/// the favorable direction (buy: `price >= tp`, sell: `price <= tp`);
/// stop-loss when it has reached-or-passed in the adverse direction
/// (buy: `price <= sl`, sell: `price >= sl`); margin exhaustion when
/// `pnl <= -margin`.
pub fn close_trigger(trade: &Trade, price: f64) -> Option<CloseTrigger> {
    if let Some(take_profit) = trade.take_profit {
        let hit = match trade.side {
            Side::Buy => price >= take_profit,
            Side::Sell => price <= take_profit,
        };
        if hit {
            return Some(CloseTrigger::TakeProfit);
        }
    }

    if let Some(stop_loss) = trade.stop_loss {
        let hit = match trade.side {
            Side::Buy => price <= stop_loss,
            Side::Sell => price >= stop_loss,
        };
        if hit {
            return Some(CloseTrigger::StopLoss);
        }
    }

    if trade.pnl_at(price) <= -trade.margin {
        return Some(CloseTrigger::MarginExhausted);
    }

    None
}

pub struct LiquidationMonitor {
    engine: Arc<TradeEngine>,
    cache: Arc<PriceCache>,
    config: EngineConfig,
}

impl LiquidationMonitor {
    pub fn new(engine: Arc<TradeEngine>, cache: Arc<PriceCache>, config: EngineConfig) -> Self {
        Self {
            engine,
            cache,
            config,
        }
    }

    /// Runs the timer-driven scan loop. Scans never overlap: the next tick
    /// is not awaited until the previous pass has finished.
    pub async fn run(self) {
        info!(
            "liquidation monitor started, scanning every {}ms",
            self.config.liquidation_interval_ms
        );
        let mut timer = tokio::time::interval(self.config.liquidation_interval());
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            timer.tick().await;
            self.scan();
        }
    }

    /// One full pass over all open trades. Returns how many were closed.
    pub fn scan(&self) -> usize {
        let mut closed = 0;
        for trade in self.engine.open_trades() {
            let Some(price) = self.cache.get(&trade.symbol) else {
                warn!(
                    "no cached price for {}, skipping risk check for trade {}",
                    trade.symbol, trade.order_id
                );
                continue;
            };

            let Some(trigger) = close_trigger(&trade, price) else {
                continue;
            };

            info!(
                "trade {} hit {trigger:?} at {price}, closing",
                trade.order_id
            );
            match self
                .engine
                .close_with_status(trade.order_id, trigger.status())
            {
                Ok(_) => closed += 1,
                // Lost the race to a concurrent close, or the exit price is
                // missing from history. Either way the scan moves on.
                Err(err) => warn!("failed to close trade {}: {err}", trade.order_id),
            }
        }
        closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use papertrade::model::trade::TradeRequest;

    fn buy_trade(entry: f64, stop_loss: Option<f64>, take_profit: Option<f64>) -> Trade {
        let mut request = TradeRequest::new(Side::Buy, "BTCUSDT", 2.0).unwrap();
        if let Some(sl) = stop_loss {
            request = request.with_stop_loss(sl).unwrap();
        }
        if let Some(tp) = take_profit {
            request = request.with_take_profit(tp).unwrap();
        }
        Trade::open(1, &request, entry, 40.0)
    }

    fn sell_trade(entry: f64, stop_loss: Option<f64>, take_profit: Option<f64>) -> Trade {
        let mut request = TradeRequest::new(Side::Sell, "BTCUSDT", 2.0).unwrap();
        if let Some(sl) = stop_loss {
            request = request.with_stop_loss(sl).unwrap();
        }
        if let Some(tp) = take_profit {
            request = request.with_take_profit(tp).unwrap();
        }
        Trade::open(1, &request, entry, 40.0)
    }

    #[test]
    fn take_profit_beats_other_rules() {
        // At 115 both take-profit and margin exhaustion are true for this
        // buy; take-profit must win.
        let mut trade = buy_trade(100.0, Some(90.0), Some(110.0));
        trade.margin = 1.0;
        assert_eq!(close_trigger(&trade, 115.0), Some(CloseTrigger::TakeProfit));
    }

    #[test]
    fn buy_direction_semantics() {
        let trade = buy_trade(100.0, Some(90.0), Some(110.0));
        assert_eq!(close_trigger(&trade, 110.0), Some(CloseTrigger::TakeProfit));
        assert_eq!(close_trigger(&trade, 90.0), Some(CloseTrigger::StopLoss));
        assert_eq!(close_trigger(&trade, 100.0), None);
    }

    #[test]
    fn sell_direction_semantics() {
        let trade = sell_trade(100.0, Some(110.0), Some(90.0));
        assert_eq!(close_trigger(&trade, 90.0), Some(CloseTrigger::TakeProfit));
        assert_eq!(close_trigger(&trade, 110.0), Some(CloseTrigger::StopLoss));
        assert_eq!(close_trigger(&trade, 100.0), None);
    }

    #[test]
    fn margin_exhaustion_at_full_loss() {
        // qty 2, margin 40: a 20-point adverse move is a full loss.
        let trade = buy_trade(100.0, None, None);
        assert_eq!(close_trigger(&trade, 81.0), None);
        assert_eq!(
            close_trigger(&trade, 80.0),
            Some(CloseTrigger::MarginExhausted)
        );
    }

    #[test]
    fn trigger_statuses() {
        assert_eq!(CloseTrigger::TakeProfit.status(), TradeStatus::Closed);
        assert_eq!(CloseTrigger::StopLoss.status(), TradeStatus::Closed);
        assert_eq!(
            CloseTrigger::MarginExhausted.status(),
            TradeStatus::Liquidated
        );
    }
}
