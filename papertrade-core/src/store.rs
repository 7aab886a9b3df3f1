//! Row-locked trade and ticker storage.
//!
//! The in-process rendering of the transactional store: every trade lives
//! behind its own mutex, and holding that mutex is the row lock, the
//! equivalent of `SELECT ... FOR UPDATE`. Two operations on different
//! trades never block each other; two on the same trade serialize and can
//! never double-close. Ticker history is an append-only log with a
//! per-symbol latest-price index for the audit price used at close.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use papertrade::model::ticker::Ticker;
use papertrade::model::trade::{Trade, TradeStatus};
use uuid::Uuid;

#[derive(Debug, Default)]
struct TickerLog {
    rows: Vec<Ticker>,
    latest: HashMap<String, f64>,
}

/// Trade rows plus the persisted price history.
#[derive(Debug, Default)]
pub struct TradeStore {
    trades: RwLock<HashMap<Uuid, Arc<Mutex<Trade>>>>,
    tickers: Mutex<TickerLog>,
}

impl TradeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a freshly opened trade.
    ///
    /// Callers must still hold the owner's balance row lock so that the
    /// margin debit and this insert commit as one unit.
    pub fn insert_trade(&self, trade: Trade) {
        let mut trades = self.trades.write().unwrap();
        trades.insert(trade.order_id, Arc::new(Mutex::new(trade)));
    }

    /// The lockable row for a trade. Locking it serializes all status
    /// transitions for this order id.
    pub fn trade_row(&self, order_id: Uuid) -> Option<Arc<Mutex<Trade>>> {
        self.trades.read().unwrap().get(&order_id).cloned()
    }

    /// A point-in-time snapshot of a trade.
    pub fn trade(&self, order_id: Uuid) -> Option<Trade> {
        self.trade_row(order_id)
            .map(|row| row.lock().unwrap().clone())
    }

    /// Snapshots of every trade currently open, across all users.
    pub fn open_trades(&self) -> Vec<Trade> {
        self.filter_trades(|trade| trade.status == TradeStatus::Open)
    }

    /// Snapshots of a user's open trades.
    pub fn open_trades_for_user(&self, user_id: u64) -> Vec<Trade> {
        self.filter_trades(|trade| trade.status == TradeStatus::Open && trade.user_id == user_id)
    }

    /// A user's settled trades, most recently closed first.
    pub fn closed_trades_for_user(&self, user_id: u64) -> Vec<Trade> {
        let mut closed =
            self.filter_trades(|trade| trade.status.is_terminal() && trade.user_id == user_id);
        closed.sort_by(|a, b| b.closed_at.cmp(&a.closed_at));
        closed
    }

    fn filter_trades(&self, keep: impl Fn(&Trade) -> bool) -> Vec<Trade> {
        // Snapshot the row handles first: holding the map lock while taking
        // row locks would order locks against open/close and can deadlock.
        let rows: Vec<Arc<Mutex<Trade>>> =
            self.trades.read().unwrap().values().cloned().collect();
        rows.into_iter()
            .filter_map(|row| {
                let trade = row.lock().unwrap();
                keep(&trade).then(|| trade.clone())
            })
            .collect()
    }

    /// Appends a batch of tickers in one call and advances the per-symbol
    /// latest price.
    pub fn insert_tickers(&self, batch: &[Ticker]) {
        if batch.is_empty() {
            return;
        }
        let mut log = self.tickers.lock().unwrap();
        for ticker in batch {
            log.latest
                .insert(ticker.symbol.clone(), ticker.trade_price);
        }
        log.rows.extend_from_slice(batch);
    }

    /// The most recently persisted trade price for a symbol, the audit
    /// price used when settling a close, as opposed to the in-memory cache.
    pub fn latest_trade_price(&self, symbol: &str) -> Option<f64> {
        self.tickers.lock().unwrap().latest.get(symbol).copied()
    }

    /// Number of persisted ticker rows.
    pub fn ticker_count(&self) -> usize {
        self.tickers.lock().unwrap().rows.len()
    }
}
