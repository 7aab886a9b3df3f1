//! Trade models.
//!
//! `Trade` is the central entity: a leveraged position backed by margin
//! reserved from the owner's balance. `TradeRequest` is the validated
//! admission boundary: it can only be constructed after all structural and
//! range checks have passed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TradeError;

/// Direction of exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

/// Lifecycle of a trade. Transitions exactly once, from `Open` to a
/// terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Open,
    /// Closed by the user or by a stop-loss/take-profit trigger.
    Closed,
    /// Force-closed by the monitor after losses consumed the margin.
    Liquidated,
}

impl TradeStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TradeStatus::Open)
    }
}

/// Leverage multipliers accepted at the admission boundary.
pub const SUPPORTED_LEVERAGE: [u32; 5] = [1, 5, 10, 20, 100];

/// Computes profit or loss for a position against a reference price.
///
/// Buy: `(current - entry) * quantity`. Sell: `(entry - current) * quantity`.
pub fn calculate_pnl(side: Side, entry_price: f64, quantity: f64, current_price: f64) -> f64 {
    match side {
        Side::Buy => (current_price - entry_price) * quantity,
        Side::Sell => (entry_price - current_price) * quantity,
    }
}

/// A leveraged position priced against the reference feed.
///
/// `margin` was debited from the owner's balance when the trade was opened
/// and the realized PnL is credited back at closure. `exit_price`,
/// `closed_at` and `realized_pnl` are set exactly once, at the transition
/// out of `Open`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub order_id: Uuid,
    pub user_id: u64,
    pub side: Side,
    pub symbol: String,
    pub quantity: f64,
    pub entry_price: f64,
    pub leverage: u32,
    pub margin: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub status: TradeStatus,
    pub created_at: DateTime<Utc>,
    pub exit_price: Option<f64>,
    pub closed_at: Option<DateTime<Utc>>,
    pub realized_pnl: Option<f64>,
}

impl Trade {
    /// Creates a freshly opened trade from an admitted request.
    pub fn open(user_id: u64, request: &TradeRequest, entry_price: f64, margin: f64) -> Self {
        Self {
            order_id: Uuid::new_v4(),
            user_id,
            side: request.side(),
            symbol: request.symbol().to_string(),
            quantity: request.quantity(),
            entry_price,
            leverage: request.effective_leverage(),
            margin,
            stop_loss: request.stop_loss(),
            take_profit: request.take_profit(),
            status: TradeStatus::Open,
            created_at: Utc::now(),
            exit_price: None,
            closed_at: None,
            realized_pnl: None,
        }
    }

    /// PnL of this position if it were valued at `price`.
    pub fn pnl_at(&self, price: f64) -> f64 {
        calculate_pnl(self.side, self.entry_price, self.quantity, price)
    }
}

/// Raw, unvalidated request shape as it arrives over the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawTradeRequest {
    side: Side,
    symbol: String,
    quantity: f64,
    #[serde(default)]
    leverage: Option<u32>,
    #[serde(default)]
    margin: Option<f64>,
    #[serde(default)]
    stop_loss: Option<f64>,
    #[serde(default)]
    take_profit: Option<f64>,
}

/// A structurally valid request to open a position.
///
/// Values of this type exist only after validation: quantity is finite and
/// positive, the symbol is non-empty, leverage (when given) is one of
/// [`SUPPORTED_LEVERAGE`] and the optional margin and trigger prices are
/// strictly positive. Deserialization goes through the same checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawTradeRequest", into = "RawTradeRequest")]
pub struct TradeRequest {
    side: Side,
    symbol: String,
    quantity: f64,
    leverage: Option<u32>,
    margin: Option<f64>,
    stop_loss: Option<f64>,
    take_profit: Option<f64>,
}

impl TradeRequest {
    /// Validates and constructs a request with no leverage, margin or
    /// trigger prices set.
    pub fn new(side: Side, symbol: impl Into<String>, quantity: f64) -> Result<Self, TradeError> {
        let symbol = symbol.into();
        if symbol.trim().is_empty() {
            return Err(TradeError::InvalidRequest("symbol must not be empty".into()));
        }
        if !quantity.is_finite() || quantity <= 0.0 {
            return Err(TradeError::InvalidRequest(format!(
                "quantity must be a positive number, got {quantity}"
            )));
        }
        Ok(Self {
            side,
            symbol,
            quantity,
            leverage: None,
            margin: None,
            stop_loss: None,
            take_profit: None,
        })
    }

    pub fn with_leverage(mut self, leverage: u32) -> Result<Self, TradeError> {
        if !SUPPORTED_LEVERAGE.contains(&leverage) {
            return Err(TradeError::InvalidRequest(format!(
                "unsupported leverage {leverage}, expected one of {SUPPORTED_LEVERAGE:?}"
            )));
        }
        self.leverage = Some(leverage);
        Ok(self)
    }

    /// An explicit margin takes precedence over the leverage-derived one.
    pub fn with_margin(mut self, margin: f64) -> Result<Self, TradeError> {
        if !margin.is_finite() || margin <= 0.0 {
            return Err(TradeError::InvalidRequest(format!(
                "margin must be a positive number, got {margin}"
            )));
        }
        self.margin = Some(margin);
        Ok(self)
    }

    pub fn with_stop_loss(mut self, stop_loss: f64) -> Result<Self, TradeError> {
        if !stop_loss.is_finite() || stop_loss <= 0.0 {
            return Err(TradeError::InvalidRequest(format!(
                "stop loss must be a positive price, got {stop_loss}"
            )));
        }
        self.stop_loss = Some(stop_loss);
        Ok(self)
    }

    pub fn with_take_profit(mut self, take_profit: f64) -> Result<Self, TradeError> {
        if !take_profit.is_finite() || take_profit <= 0.0 {
            return Err(TradeError::InvalidRequest(format!(
                "take profit must be a positive price, got {take_profit}"
            )));
        }
        self.take_profit = Some(take_profit);
        Ok(self)
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn leverage(&self) -> Option<u32> {
        self.leverage
    }

    /// Leverage used for margin derivation, defaulting to 1 when omitted.
    pub fn effective_leverage(&self) -> u32 {
        self.leverage.unwrap_or(1)
    }

    pub fn margin(&self) -> Option<f64> {
        self.margin
    }

    pub fn stop_loss(&self) -> Option<f64> {
        self.stop_loss
    }

    pub fn take_profit(&self) -> Option<f64> {
        self.take_profit
    }
}

impl TryFrom<RawTradeRequest> for TradeRequest {
    type Error = TradeError;

    fn try_from(raw: RawTradeRequest) -> Result<Self, Self::Error> {
        let mut request = TradeRequest::new(raw.side, raw.symbol, raw.quantity)?;
        if let Some(leverage) = raw.leverage {
            request = request.with_leverage(leverage)?;
        }
        if let Some(margin) = raw.margin {
            request = request.with_margin(margin)?;
        }
        if let Some(stop_loss) = raw.stop_loss {
            request = request.with_stop_loss(stop_loss)?;
        }
        if let Some(take_profit) = raw.take_profit {
            request = request.with_take_profit(take_profit)?;
        }
        Ok(request)
    }
}

impl From<TradeRequest> for RawTradeRequest {
    fn from(request: TradeRequest) -> Self {
        Self {
            side: request.side,
            symbol: request.symbol,
            quantity: request.quantity,
            leverage: request.leverage,
            margin: request.margin,
            stop_loss: request.stop_loss,
            take_profit: request.take_profit,
        }
    }
}

/// A queued request to open a position on behalf of a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeJob {
    pub user_id: u64,
    pub request: TradeRequest,
}

impl TradeJob {
    pub fn new(user_id: u64, request: TradeRequest) -> Self {
        Self { user_id, request }
    }
}
