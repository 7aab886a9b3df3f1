//! The typed error taxonomy of the trading engine.

use thiserror::Error;
use uuid::Uuid;

/// Everything that can go wrong when admitting, valuing or closing a trade.
///
/// Admission errors (`NoPriceAvailable`, `InsufficientFunds`, `InvalidRequest`)
/// are surfaced synchronously to the caller; the queue worker retries them on
/// its own schedule for queued jobs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TradeError {
    /// No reference price is known for the symbol. Retriable: the feed may
    /// simply not have delivered a tick yet.
    #[error("no price available for {0}")]
    NoPriceAvailable(String),

    /// The balance cannot cover the required margin.
    #[error("insufficient funds: margin {required:.2} exceeds balance {available:.2}")]
    InsufficientFunds { required: f64, available: f64 },

    /// The request failed structural validation before reaching the engine.
    #[error("invalid trade request: {0}")]
    InvalidRequest(String),

    /// No trade exists with this order id.
    #[error("trade {0} not found")]
    NotFound(Uuid),

    /// The trade has already reached a terminal status.
    #[error("trade {0} is not open")]
    NotOpen(Uuid),

    /// No balance record exists for this user.
    #[error("no balance record for user {0}")]
    UnknownUser(u64),
}
