//! Trade admission, closure, live valuation and account summaries.
//!
//! The engine owns no state of its own; it orchestrates the price cache,
//! the ledger and the store, and it is the only place where balance and
//! trade rows are mutated. Both mutations of an atomic unit happen under
//! the relevant row lock, so a crash of a caller can never leave a margin
//! debited without its trade row or a trade closed without its PnL credit.

use std::sync::Arc;

use log::{info, warn};
use papertrade::error::TradeError;
use papertrade::model::account::{AccountSummary, PositionPnl};
use papertrade::model::trade::{Trade, TradeRequest, TradeStatus};
use uuid::Uuid;

use crate::cache::PriceCache;
use crate::ledger::AccountLedger;
use crate::store::TradeStore;

pub struct TradeEngine {
    store: Arc<TradeStore>,
    ledger: Arc<AccountLedger>,
    cache: Arc<PriceCache>,
}

impl TradeEngine {
    pub fn new(store: Arc<TradeStore>, ledger: Arc<AccountLedger>, cache: Arc<PriceCache>) -> Self {
        Self {
            store,
            ledger,
            cache,
        }
    }

    /// Opens a leveraged position.
    ///
    /// Entry price comes from the cache (`NoPriceAvailable` when the feed
    /// has not delivered the symbol yet). Margin is the caller's explicit
    /// value or `quantity * entry_price / leverage`. Funds check, margin
    /// debit and trade insert commit as one unit under the balance row
    /// lock; any failure before that leaves no partial state.
    pub fn open(&self, user_id: u64, request: &TradeRequest) -> Result<Uuid, TradeError> {
        let entry_price = self
            .cache
            .get(request.symbol())
            .ok_or_else(|| TradeError::NoPriceAvailable(request.symbol().to_string()))?;

        let leverage = request.effective_leverage();
        let margin = request
            .margin()
            .unwrap_or(request.quantity() * entry_price / leverage as f64);

        let row = self.ledger.row(user_id)?;
        let mut balance = row.lock().unwrap();
        if *balance < margin {
            return Err(TradeError::InsufficientFunds {
                required: margin,
                available: *balance,
            });
        }
        *balance -= margin;

        let trade = Trade::open(user_id, request, entry_price, margin);
        let order_id = trade.order_id;
        self.store.insert_trade(trade);

        info!(
            "opened trade {order_id} for user {user_id}: {:?} {} x{leverage} @ {entry_price}, margin {margin:.2}",
            request.side(),
            request.symbol(),
        );
        Ok(order_id)
    }

    /// Closes a position at the latest persisted price.
    pub fn close(&self, order_id: Uuid) -> Result<Trade, TradeError> {
        self.close_with_status(order_id, TradeStatus::Closed)
    }

    /// Transitions an open trade to `status`, settling realized PnL.
    ///
    /// The exit price is the latest *persisted* trade price rather than the
    /// in-memory cache, so every settlement is backed by a price-history
    /// row. Status fields and the balance credit commit under the trade
    /// row lock; lock order is trade row then balance row.
    pub(crate) fn close_with_status(
        &self,
        order_id: Uuid,
        status: TradeStatus,
    ) -> Result<Trade, TradeError> {
        debug_assert!(status.is_terminal());

        let row = self
            .store
            .trade_row(order_id)
            .ok_or(TradeError::NotFound(order_id))?;
        let mut trade = row.lock().unwrap();
        if trade.status != TradeStatus::Open {
            return Err(TradeError::NotOpen(order_id));
        }

        let exit_price = self
            .store
            .latest_trade_price(&trade.symbol)
            .ok_or_else(|| TradeError::NoPriceAvailable(trade.symbol.clone()))?;

        // Resolve the balance row before mutating anything so the unit
        // cannot fail between the status transition and the credit.
        let balance_row = self.ledger.row(trade.user_id)?;

        let realized_pnl = trade.pnl_at(exit_price);
        trade.status = status;
        trade.exit_price = Some(exit_price);
        trade.closed_at = Some(chrono::Utc::now());
        trade.realized_pnl = Some(realized_pnl);

        let new_balance = {
            let mut balance = balance_row.lock().unwrap();
            *balance += realized_pnl;
            *balance
        };

        info!(
            "trade {order_id} -> {status:?} @ {exit_price}: realized pnl {realized_pnl:.2}, balance {new_balance:.2}"
        );
        Ok(trade.clone())
    }

    /// Live valuation of every open position a user holds.
    ///
    /// Positions in symbols absent from the cache are reported with an
    /// explicit unknown PnL rather than dropped or zeroed.
    pub fn unrealized_pnl_for_user(&self, user_id: u64) -> Vec<PositionPnl> {
        self.store
            .open_trades_for_user(user_id)
            .into_iter()
            .map(|trade| {
                let unrealized_pnl = match self.cache.get(&trade.symbol) {
                    Some(price) => Some(trade.pnl_at(price)),
                    None => {
                        warn!(
                            "no cached price for {}, cannot value trade {}",
                            trade.symbol, trade.order_id
                        );
                        None
                    }
                };
                PositionPnl {
                    trade,
                    unrealized_pnl,
                }
            })
            .collect()
    }

    /// On-demand account aggregation: balance, committed margin, live PnL.
    pub fn account_summary(&self, user_id: u64) -> Result<AccountSummary, TradeError> {
        let balance = self.ledger.balance(user_id)?;
        let open = self.store.open_trades_for_user(user_id);

        let total_margin_used: f64 = open.iter().map(|trade| trade.margin).sum();
        let total_unrealized_pnl: f64 = open
            .iter()
            .filter_map(|trade| self.cache.get(&trade.symbol).map(|price| trade.pnl_at(price)))
            .sum();

        Ok(AccountSummary {
            balance,
            total_margin_used,
            total_unrealized_pnl,
            equity: balance + total_unrealized_pnl,
            free_margin: balance - total_margin_used,
        })
    }

    /// Snapshot of a single trade.
    pub fn trade(&self, order_id: Uuid) -> Option<Trade> {
        self.store.trade(order_id)
    }

    /// Every open trade across all users, for the liquidation scan.
    pub fn open_trades(&self) -> Vec<Trade> {
        self.store.open_trades()
    }

    pub fn open_trades_for_user(&self, user_id: u64) -> Vec<Trade> {
        self.store.open_trades_for_user(user_id)
    }

    pub fn closed_trades_for_user(&self, user_id: u64) -> Vec<Trade> {
        self.store.closed_trades_for_user(user_id)
    }
}
