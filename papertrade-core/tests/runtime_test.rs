//! Whole-engine integration tests: ticks in at one end, settled trades
//! and events out at the other, with the background tasks doing the work.

use std::future::Future;
use std::time::Duration;

use papertrade::model::ticker::RawTick;
use papertrade::model::trade::{Side, TradeJob, TradeRequest, TradeStatus};
use papertrade_core::bus::EngineEvent;
use papertrade_core::{EngineConfig, EngineRuntime};

fn fast_config() -> EngineConfig {
    EngineConfig {
        idle_backoff_ms: 10,
        retry_delay_ms: 25,
        liquidation_interval_ms: 25,
        pnl_interval_ms: 50,
        seed_balance: 5_000.0,
        ..EngineConfig::default()
    }
}

/// Polls `check` until it returns true or the deadline passes.
async fn eventually<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for: {what}");
}

async fn feed_price(runtime: &EngineRuntime, symbol: &str, price: f64) {
    runtime
        .push_tick(RawTick::new(symbol, price, 0.5, 1_700_000_000_000))
        .await
        .unwrap();
    let runtime_store = runtime.store.clone();
    let symbol = symbol.to_string();
    eventually("tick to be persisted", move || {
        let store = runtime_store.clone();
        let symbol = symbol.clone();
        async move { store.latest_trade_price(&symbol) == Some(price) }
    })
    .await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn ticks_flow_into_store_and_cache() {
    let runtime = EngineRuntime::start(fast_config());

    feed_price(&runtime, "BTCUSDT", 50_000.0).await;

    // The cache picks up the ask side off the bus.
    let cache = runtime.cache.clone();
    eventually("cache to hold the ask", move || {
        let cache = cache.clone();
        async move { cache.get("BTCUSDT") == Some(50_500.0) }
    })
    .await;
    assert_eq!(runtime.store.ticker_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn queued_job_becomes_a_committed_trade() {
    let runtime = EngineRuntime::start(fast_config());
    runtime.seed_account(1);
    let mut events = runtime.bus.subscribe();

    feed_price(&runtime, "BTCUSDT", 50_000.0).await;

    let request = TradeRequest::new(Side::Buy, "BTCUSDT", 0.01)
        .unwrap()
        .with_leverage(10)
        .unwrap();
    runtime.submit_job(TradeJob::new(1, request)).await.unwrap();

    let engine = runtime.engine.clone();
    eventually("job to commit", move || {
        let engine = engine.clone();
        async move { engine.open_trades_for_user(1).len() == 1 }
    })
    .await;

    // Margin at entry 50500 (ask), qty 0.01, leverage 10 -> 50.5.
    let balance = runtime.ledger.balance(1).unwrap();
    assert!((balance - 4_949.5).abs() < 1e-9, "balance: {balance}");

    // A TradeSuccess event went out after the commit.
    let deadline = tokio::time::sleep(Duration::from_secs(2));
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            event = events.recv() => {
                if let EngineEvent::TradeSuccess { user_id, .. } = event.unwrap() {
                    assert_eq!(user_id, 1);
                    break;
                }
            }
            _ = &mut deadline => panic!("expected a TradeSuccess event"),
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn job_for_unknown_symbol_fails_after_retries() {
    let runtime = EngineRuntime::start(fast_config());
    runtime.seed_account(1);
    let mut events = runtime.bus.subscribe();

    let request = TradeRequest::new(Side::Buy, "NOPEUSDT", 1.0).unwrap();
    runtime.submit_job(TradeJob::new(1, request)).await.unwrap();

    let deadline = tokio::time::sleep(Duration::from_secs(5));
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            event = events.recv() => match event.unwrap() {
                EngineEvent::TradeFailure { user_id, reason, .. } => {
                    assert_eq!(user_id, 1);
                    assert!(reason.contains("no price available"), "reason: {reason}");
                    break;
                }
                _ => {}
            },
            _ = &mut deadline => panic!("no TradeFailure event arrived"),
        }
    }
    assert!(runtime.engine.open_trades_for_user(1).is_empty());
    assert_eq!(runtime.ledger.balance(1).unwrap(), 5_000.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn take_profit_closes_ahead_of_liquidation() {
    let runtime = EngineRuntime::start(fast_config());
    runtime.seed_account(1);

    feed_price(&runtime, "BTCUSDT", 100.0).await;
    let cache = runtime.cache.clone();
    eventually("cache warm-up", move || {
        let cache = cache.clone();
        async move { cache.get("BTCUSDT").is_some() }
    })
    .await;

    // Tiny margin so that at 115 margin exhaustion would also be true;
    // the take-profit rule must still be the one that fires.
    let request = TradeRequest::new(Side::Buy, "BTCUSDT", 2.0)
        .unwrap()
        .with_margin(1.0)
        .unwrap()
        .with_stop_loss(90.0)
        .unwrap()
        .with_take_profit(110.0)
        .unwrap();
    let order_id = runtime.engine.open(1, &request).unwrap();

    feed_price(&runtime, "BTCUSDT", 115.0).await;

    let engine = runtime.engine.clone();
    eventually("monitor to close the trade", move || {
        let engine = engine.clone();
        async move {
            engine
                .trade(order_id)
                .map(|t| t.status.is_terminal())
                .unwrap_or(false)
        }
    })
    .await;

    let trade = runtime.engine.trade(order_id).unwrap();
    assert_eq!(trade.status, TradeStatus::Closed, "take-profit, not liquidation");
    assert_eq!(trade.exit_price, Some(115.0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn margin_exhaustion_marks_trade_liquidated() {
    let runtime = EngineRuntime::start(fast_config());
    runtime.seed_account(1);

    feed_price(&runtime, "ETHUSDT", 100.0).await;
    let cache = runtime.cache.clone();
    eventually("cache warm-up", move || {
        let cache = cache.clone();
        async move { cache.get("ETHUSDT").is_some() }
    })
    .await;

    // No stop-loss or take-profit: only the margin rule can fire.
    let request = TradeRequest::new(Side::Buy, "ETHUSDT", 1.0)
        .unwrap()
        .with_margin(5.0)
        .unwrap();
    let order_id = runtime.engine.open(1, &request).unwrap();

    feed_price(&runtime, "ETHUSDT", 60.0).await;

    let engine = runtime.engine.clone();
    eventually("monitor to liquidate", move || {
        let engine = engine.clone();
        async move {
            engine
                .trade(order_id)
                .map(|t| t.status.is_terminal())
                .unwrap_or(false)
        }
    })
    .await;

    assert_eq!(
        runtime.engine.trade(order_id).unwrap().status,
        TradeStatus::Liquidated
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn idle_pipeline_wakes_up_for_late_ticks() {
    let runtime = EngineRuntime::start(fast_config());

    // Let the pipeline sit idle through many backoff cycles first.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(runtime.store.ticker_count(), 0);

    feed_price(&runtime, "BTCUSDT", 42_000.0).await;
    assert_eq!(runtime.store.ticker_count(), 1);
}
