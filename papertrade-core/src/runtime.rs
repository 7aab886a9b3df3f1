//! Runtime wiring.
//!
//! Builds the shared components, connects the queues to the workers and
//! spawns every long-running task. The pipelines share no state beyond the
//! injected cache, ledger, store and bus; the storage layer is the sole
//! synchronization point.

use std::sync::Arc;

use papertrade::model::ticker::RawTick;
use papertrade::model::trade::TradeJob;
use tokio::task::JoinHandle;

use crate::bus::EventBus;
use crate::cache::PriceCache;
use crate::config::EngineConfig;
use crate::engine::TradeEngine;
use crate::ingestion::{run_price_listener, TickerIngestionPipeline};
use crate::ledger::AccountLedger;
use crate::monitor::LiquidationMonitor;
use crate::pnl::PnlSnapshotWorker;
use crate::queue::{job_queue, tick_queue, JobSender, TickSender};
use crate::store::TradeStore;
use crate::worker::OrderQueueWorker;

/// A fully wired engine with its background tasks running.
///
/// Dropping the runtime aborts the tasks; in a service they run for the
/// process lifetime.
pub struct EngineRuntime {
    pub config: EngineConfig,
    pub cache: Arc<PriceCache>,
    pub store: Arc<TradeStore>,
    pub ledger: Arc<AccountLedger>,
    pub engine: Arc<TradeEngine>,
    pub bus: EventBus,
    ticks: TickSender,
    jobs: JobSender,
    tasks: Vec<JoinHandle<()>>,
}

impl EngineRuntime {
    /// Constructs every component and spawns the ingestion pipeline, price
    /// listener, order worker, liquidation monitor and PnL snapshot worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: EngineConfig) -> Self {
        let cache = Arc::new(PriceCache::new());
        let store = Arc::new(TradeStore::new());
        let ledger = Arc::new(AccountLedger::new());
        let engine = Arc::new(TradeEngine::new(
            Arc::clone(&store),
            Arc::clone(&ledger),
            Arc::clone(&cache),
        ));
        let bus = EventBus::new(config.event_capacity);

        let (ticks, tick_drain) = tick_queue(config.tick_queue_capacity);
        let (jobs, job_stream) = job_queue(config.job_queue_capacity);

        let pipeline = TickerIngestionPipeline::new(
            tick_drain,
            Arc::clone(&store),
            bus.clone(),
            config.clone(),
        );
        let worker = OrderQueueWorker::new(job_stream, Arc::clone(&engine), bus.clone(), &config);
        let monitor =
            LiquidationMonitor::new(Arc::clone(&engine), Arc::clone(&cache), config.clone());
        let pnl = PnlSnapshotWorker::new(
            Arc::clone(&engine),
            Arc::clone(&ledger),
            bus.clone(),
            config.clone(),
        );

        // Subscribe before spawning the pipeline so the very first tick's
        // price update already has a listener.
        let price_events = bus.subscribe();

        let tasks = vec![
            tokio::spawn(pipeline.run()),
            tokio::spawn(run_price_listener(price_events, Arc::clone(&cache))),
            tokio::spawn(worker.run()),
            tokio::spawn(monitor.run()),
            tokio::spawn(pnl.run()),
        ];

        Self {
            config,
            cache,
            store,
            ledger,
            engine,
            bus,
            ticks,
            jobs,
            tasks,
        }
    }

    /// Seeds an account with the configured starting balance.
    pub fn seed_account(&self, user_id: u64) {
        self.ledger.ensure_account(user_id, self.config.seed_balance);
    }

    /// Hands a raw tick to the ingestion queue; waits when the queue is
    /// full (feed backpressure).
    pub async fn push_tick(&self, tick: RawTick) -> anyhow::Result<()> {
        self.ticks.push(tick).await
    }

    /// Queues a trade request for asynchronous processing.
    pub async fn submit_job(&self, job: TradeJob) -> anyhow::Result<()> {
        self.jobs.push(job).await
    }

    /// A clonable handle for producers living outside the runtime.
    pub fn tick_sender(&self) -> TickSender {
        self.ticks.clone()
    }

    pub fn job_sender(&self) -> JobSender {
        self.jobs.clone()
    }
}

impl Drop for EngineRuntime {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
