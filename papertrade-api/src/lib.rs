//! # Papertrade API
//!
//! Shared models and the error taxonomy for the paper-trading engine.
//!
//! ## Modules
//! - `model`: The domain entities (Trade, Ticker, account views) with
//!   identical serialization across services.
//! - `error`: The typed error taxonomy surfaced by the engine.

pub mod error;
pub mod model;

pub use error::TradeError;
pub use model::account::{AccountSummary, PositionPnl};
pub use model::ticker::{RawTick, Ticker};
pub use model::trade::{calculate_pnl, Side, Trade, TradeJob, TradeRequest, TradeStatus};
