//! The order queue worker.
//!
//! Turns queued trade requests into committed trades: one blocking dequeue
//! at a time, a bounded number of open attempts per job with a fixed pause
//! between them (enough for a momentarily missing price to arrive), then a
//! terminal success or failure event. An exhausted job is discarded; the
//! failure event is the only record of it.

use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use papertrade::error::TradeError;
use papertrade::model::trade::TradeJob;

use crate::bus::{EngineEvent, EventBus};
use crate::config::EngineConfig;
use crate::engine::TradeEngine;
use crate::queue::JobStream;

pub struct OrderQueueWorker {
    jobs: JobStream,
    engine: Arc<TradeEngine>,
    bus: EventBus,
    max_attempts: u32,
    retry_delay: Duration,
}

impl OrderQueueWorker {
    pub fn new(jobs: JobStream, engine: Arc<TradeEngine>, bus: EventBus, config: &EngineConfig) -> Self {
        Self {
            jobs,
            engine,
            bus,
            max_attempts: config.max_open_attempts,
            retry_delay: config.retry_delay(),
        }
    }

    /// Runs the worker loop: suspended while the queue is empty, one job
    /// in flight at a time.
    pub async fn run(mut self) {
        info!("order worker started, waiting for jobs");
        while let Some(job) = self.jobs.next().await {
            self.process_job(job).await;
        }
        info!("trade job queue closed, order worker stopping");
    }

    /// Attempts a single job to its terminal state: committed, or
    /// exhausted after `max_attempts` tries.
    pub async fn process_job(&self, job: TradeJob) {
        let mut last_error: Option<TradeError> = None;

        for attempt in 1..=self.max_attempts {
            info!(
                "attempt {attempt}/{} for user {}, symbol {}",
                self.max_attempts,
                job.user_id,
                job.request.symbol()
            );
            match self.engine.open(job.user_id, &job.request) {
                Ok(order_id) => {
                    info!("committed trade {order_id} for user {}", job.user_id);
                    self.bus.publish(EngineEvent::TradeSuccess {
                        user_id: job.user_id,
                        order_id,
                        request: job.request,
                    });
                    return;
                }
                Err(err) => {
                    warn!("attempt {attempt} failed for user {}: {err}", job.user_id);
                    last_error = Some(err);
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        let reason = last_error
            .map(|err| err.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        error!(
            "all {} attempts failed for user {}, discarding job: {reason}",
            self.max_attempts, job.user_id
        );
        self.bus.publish(EngineEvent::TradeFailure {
            user_id: job.user_id,
            reason,
            request: job.request,
        });
    }
}
