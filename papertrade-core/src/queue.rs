//! In-process queues for raw ticks and trade jobs.
//!
//! Bounded MPSC channels standing in for the durable queue collaborator:
//! the tick queue supports non-blocking batch drains (the ingestion side
//! never blocks the feed), the job queue supports a blocking single-job
//! receive (the order worker suspends rather than polls). Bounded capacity
//! is the backpressure: a slow consumer throttles producers at `push`.

use anyhow::Result;
use papertrade::model::ticker::RawTick;
use papertrade::model::trade::TradeJob;
use tokio::sync::mpsc;

/// Creates the raw-tick queue, returning the feed-side sender and the
/// ingestion-side drain.
pub fn tick_queue(capacity: usize) -> (TickSender, TickDrain) {
    let (tx, rx) = mpsc::channel(capacity);
    (TickSender { tx }, TickDrain { rx })
}

/// Creates the trade-job queue, returning the request-side sender and the
/// worker-side stream.
pub fn job_queue(capacity: usize) -> (JobSender, JobStream) {
    let (tx, rx) = mpsc::channel(capacity);
    (JobSender { tx }, JobStream { rx })
}

/// Feed-side handle pushing raw ticks; waits when the queue is full.
#[derive(Clone)]
pub struct TickSender {
    tx: mpsc::Sender<RawTick>,
}

impl TickSender {
    pub async fn push(&self, tick: RawTick) -> Result<()> {
        self.tx
            .send(tick)
            .await
            .map_err(|_| anyhow::anyhow!("tick queue closed"))
    }
}

/// Ingestion-side handle draining ticks in non-blocking batches.
pub struct TickDrain {
    rx: mpsc::Receiver<RawTick>,
}

impl TickDrain {
    /// Takes up to `max` queued ticks without waiting. An empty result
    /// means the queue is currently empty, not that it is closed.
    pub fn drain(&mut self, max: usize) -> Vec<RawTick> {
        let mut batch = Vec::new();
        while batch.len() < max {
            match self.rx.try_recv() {
                Ok(tick) => batch.push(tick),
                Err(_) => break,
            }
        }
        batch
    }
}

/// Request-side handle queuing trade jobs.
#[derive(Clone)]
pub struct JobSender {
    tx: mpsc::Sender<TradeJob>,
}

impl JobSender {
    pub async fn push(&self, job: TradeJob) -> Result<()> {
        self.tx
            .send(job)
            .await
            .map_err(|_| anyhow::anyhow!("trade job queue closed"))
    }
}

/// Worker-side handle receiving one job at a time.
pub struct JobStream {
    rx: mpsc::Receiver<TradeJob>,
}

impl JobStream {
    /// Suspends until a job arrives; `None` when every sender is gone.
    pub async fn next(&mut self) -> Option<TradeJob> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use papertrade::model::trade::{Side, TradeRequest};

    #[tokio::test]
    async fn drain_respects_batch_size() {
        let (tx, mut rx) = tick_queue(128);
        for i in 0..60 {
            tx.push(RawTick::new("BTCUSDT", 50_000.0 + i as f64, 0.1, i))
                .await
                .unwrap();
        }
        assert_eq!(rx.drain(50).len(), 50);
        assert_eq!(rx.drain(50).len(), 10);
        assert!(rx.drain(50).is_empty());
    }

    #[tokio::test]
    async fn empty_drain_does_not_block() {
        let (_tx, mut rx) = tick_queue(8);
        assert!(rx.drain(50).is_empty());
    }

    #[tokio::test]
    async fn job_stream_delivers_in_order() {
        let (tx, mut rx) = job_queue(8);
        for user_id in 1..=3 {
            let request = TradeRequest::new(Side::Buy, "ETHUSDT", 1.0).unwrap();
            tx.push(TradeJob::new(user_id, request)).await.unwrap();
        }
        for expected in 1..=3 {
            assert_eq!(rx.next().await.unwrap().user_id, expected);
        }
    }
}
