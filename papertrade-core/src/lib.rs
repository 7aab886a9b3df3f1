//! # Papertrade Core
//!
//! The leveraged paper-trading engine: price cache, account ledger, trade
//! engine and the asynchronous pipelines (tick ingestion, order queue
//! worker, liquidation monitor, PnL snapshots) that keep them fed.
//!
//! ## Modules
//! - `cache`: Last-value price cache shared across every valuation path.
//! - `bus`: Best-effort broadcast of price and trade lifecycle events.
//! - `queue`: Bounded in-process queues for raw ticks and trade jobs.
//! - `store`: Row-locked trade and ticker storage.
//! - `ledger`: Per-user balance rows with row-level locking.
//! - `engine`: Trade admission, closure, PnL and account summaries.
//! - `ingestion`: Raw-tick batching, bid/ask derivation, price fan-out.
//! - `worker`: Bounded-retry consumer of queued trade jobs.
//! - `monitor`: Stop-loss/take-profit/liquidation scans.
//! - `pnl`: Periodic unrealized-PnL snapshots.
//! - `runtime`: Wires the components and spawns the long-running tasks.

pub mod bus;
pub mod cache;
pub mod config;
pub mod engine;
pub mod ingestion;
pub mod ledger;
pub mod monitor;
pub mod pnl;
pub mod queue;
pub mod runtime;
pub mod store;
pub mod worker;

pub use bus::{EngineEvent, EventBus};
pub use cache::PriceCache;
pub use config::EngineConfig;
pub use engine::TradeEngine;
pub use ingestion::TickerIngestionPipeline;
pub use ledger::AccountLedger;
pub use monitor::LiquidationMonitor;
pub use runtime::EngineRuntime;
pub use store::TradeStore;
pub use worker::OrderQueueWorker;
