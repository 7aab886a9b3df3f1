//! Account views: on-demand aggregations over a user's balance and open
//! positions. Never cached, never authoritative beyond the instant they
//! were computed.

use serde::{Deserialize, Serialize};

use crate::model::trade::Trade;

/// A point-in-time view of an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSummary {
    pub balance: f64,
    /// Margin committed to open positions.
    pub total_margin_used: f64,
    /// Sum of unrealized PnL over positions with a known price.
    pub total_unrealized_pnl: f64,
    /// `balance + total_unrealized_pnl`.
    pub equity: f64,
    /// `balance - total_margin_used`.
    pub free_margin: f64,
}

/// An open position with its live valuation.
///
/// `unrealized_pnl` is `None` when no reference price is currently cached
/// for the symbol: an explicit unknown, not a zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionPnl {
    pub trade: Trade,
    pub unrealized_pnl: Option<f64>,
}
