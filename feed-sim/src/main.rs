//! A synthetic feed driving the paper-trading engine end to end.
//!
//! Stands in for the exchange socket: generates random-walk ticks for a
//! set of symbols, seeds a few demo accounts, queues one leveraged trade
//! per account and then lets the engine run, so ingestion, admission,
//! PnL snapshots and liquidation scans all exercise the real paths.

use anyhow::Result;
use clap::Parser;
use log::info;
use papertrade::model::ticker::RawTick;
use papertrade::model::trade::{Side, TradeJob, TradeRequest};
use papertrade_core::bus::EngineEvent;
use papertrade_core::{EngineConfig, EngineRuntime};
use rand::Rng;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(about = "Synthetic tick feed and demo driver for the paper-trading engine")]
struct Args {
    /// Comma-separated symbols to generate ticks for.
    #[arg(long, default_value = "BTCUSDT,ETHUSDT,SOLUSDT")]
    symbols: String,

    /// Milliseconds between tick batches.
    #[arg(long, default_value_t = 250)]
    tick_interval_ms: u64,

    /// Starting price of every symbol's random walk.
    #[arg(long, default_value_t = 100.0)]
    start_price: f64,

    /// Number of demo accounts to seed.
    #[arg(long, default_value_t = 3)]
    users: u64,

    /// Balance seeded into each demo account.
    #[arg(long, default_value_t = 5_000.0)]
    seed_balance: f64,
}

/// A simple random-walk tick generator.
struct RandomWalk {
    symbols: Vec<String>,
    prices: Vec<f64>,
}

impl RandomWalk {
    fn new(symbols: Vec<String>, start_price: f64) -> Self {
        let prices = vec![start_price; symbols.len()];
        Self { symbols, prices }
    }

    fn next_ticks(&mut self) -> Vec<RawTick> {
        let mut rng = rand::thread_rng();
        let now = chrono_now_millis();

        self.symbols
            .iter()
            .enumerate()
            .map(|(i, symbol)| {
                // Random walk: +/- 1% per step, floored to stay positive.
                let change_pct = rng.gen_range(-0.01..0.01);
                self.prices[i] = (self.prices[i] * (1.0 + change_pct)).max(0.01);
                RawTick::new(symbol.clone(), self.prices[i], rng.gen_range(0.01..1.0), now)
            })
            .collect()
    }
}

fn chrono_now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Logs the engine's event stream so a demo run is observable.
async fn log_events(bus: papertrade_core::EventBus) {
    use tokio::sync::broadcast::error::RecvError;

    let mut events = bus.subscribe();
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break,
        };
        match event {
            EngineEvent::TradeSuccess { user_id, order_id, .. } => {
                info!("user {user_id}: trade {order_id} committed");
            }
            EngineEvent::TradeFailure { user_id, reason, .. } => {
                info!("user {user_id}: trade rejected ({reason})");
            }
            EngineEvent::UnrealizedPnl { user_id, positions } => {
                let total: f64 = positions.iter().filter_map(|p| p.unrealized_pnl).sum();
                info!("user {user_id}: {} open positions, unrealized pnl {total:.2}", positions.len());
            }
            EngineEvent::PriceUpdate { .. } => {}
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let symbols: Vec<String> = args
        .symbols
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    anyhow::ensure!(!symbols.is_empty(), "at least one symbol is required");

    let config = EngineConfig {
        seed_balance: args.seed_balance,
        ..EngineConfig::default()
    };
    let runtime = EngineRuntime::start(config);

    for user_id in 1..=args.users {
        runtime.seed_account(user_id);
    }
    tokio::spawn(log_events(runtime.bus.clone()));

    let mut feed = RandomWalk::new(symbols.clone(), args.start_price);

    // Prime the engine with one tick per symbol before queuing any trades.
    for tick in feed.next_ticks() {
        runtime.push_tick(tick).await?;
    }
    tokio::time::sleep(Duration::from_millis(200)).await;

    for user_id in 1..=args.users {
        let symbol = &symbols[(user_id as usize - 1) % symbols.len()];
        let request = TradeRequest::new(Side::Buy, symbol.clone(), 1.0)?
            .with_leverage(10)?
            .with_stop_loss(args.start_price * 0.9)?
            .with_take_profit(args.start_price * 1.1)?;
        runtime.submit_job(TradeJob::new(user_id, request)).await?;
    }

    info!(
        "feeding {} symbols every {}ms, ctrl-c to stop",
        symbols.len(),
        args.tick_interval_ms
    );
    loop {
        for tick in feed.next_ticks() {
            runtime.push_tick(tick).await?;
        }
        tokio::time::sleep(Duration::from_millis(args.tick_interval_ms)).await;
    }
}
