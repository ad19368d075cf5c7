//! Bounded consumer stage.
//!
//! [`ConcurrentProcessor`] drains the work channel, admits at most N worker
//! tasks at a time through a semaphore, and forwards their records to the
//! result channel. It closes the result channel only after every worker it
//! dispatched has finished.

use crate::protocols::Fetch;
use crate::types::{ConsumerReport, CountRecord, MAX_CONCURRENCY};
use crate::worker::CountWorker;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// How a single worker task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Succeeded,
    Failed,
    Cancelled,
}

/// Manages the worker pool for one pipeline run.
pub struct ConcurrentProcessor<F> {
    worker: Arc<CountWorker<F>>,
    /// Admission tokens; one permit per in-flight worker
    tokens: Arc<Semaphore>,
    max_concurrency: usize,
    intake: CancellationToken,
}

impl<F: Fetch> ConcurrentProcessor<F> {
    /// Create a processor that runs at most `max_concurrency` workers at once,
    /// clamped to `1..=MAX_CONCURRENCY`.
    pub fn new(worker: CountWorker<F>, max_concurrency: usize, intake: CancellationToken) -> Self {
        let max_concurrency = max_concurrency.clamp(1, MAX_CONCURRENCY);
        Self {
            worker: Arc::new(worker),
            tokens: Arc::new(Semaphore::new(max_concurrency)),
            max_concurrency,
            intake,
        }
    }

    /// Handle to the admission token pool, for observing how many slots are free.
    pub fn admission_tokens(&self) -> Arc<Semaphore> {
        Arc::clone(&self.tokens)
    }

    /// Spawn [`run`](Self::run) as the coordinating task.
    pub fn spawn(
        self,
        work_rx: mpsc::Receiver<String>,
        result_tx: mpsc::Sender<CountRecord>,
    ) -> JoinHandle<ConsumerReport> {
        tokio::spawn(self.run(work_rx, result_tx))
    }

    /// Drain `work_rx`, dispatching each URL to a worker task.
    ///
    /// Returns once the work channel is exhausted (or intake is cancelled)
    /// and every dispatched worker has completed. `result_tx` is dropped on
    /// return; once the last worker's clone is gone the result channel closes.
    pub async fn run(
        self,
        mut work_rx: mpsc::Receiver<String>,
        result_tx: mpsc::Sender<CountRecord>,
    ) -> ConsumerReport {
        let mut report = ConsumerReport::default();
        let mut in_flight: JoinSet<Outcome> = JoinSet::new();

        info!(concurrency = self.max_concurrency, "consumer started");

        loop {
            let url = tokio::select! {
                biased;
                _ = self.intake.cancelled() => break,
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    tally(&mut report, joined);
                    continue;
                }
                next = work_rx.recv() => match next {
                    Some(url) => url,
                    None => break,
                },
            };

            let permit = tokio::select! {
                biased;
                _ = self.intake.cancelled() => {
                    report.discarded += 1;
                    break;
                }
                permit = Arc::clone(&self.tokens).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(e) => {
                        error!(error = %e, "admission tokens closed, stopping intake");
                        report.discarded += 1;
                        break;
                    }
                },
            };

            report.dispatched += 1;
            debug!(url = %url, in_flight = in_flight.len() + 1, "dispatching");

            let worker = Arc::clone(&self.worker);
            let result_tx = result_tx.clone();
            in_flight.spawn(async move {
                // Released when this future completes or is dropped, panics included.
                let _permit = permit;

                match worker.process(&url).await {
                    Ok(record) => {
                        debug!(url = %record.url, count = record.count, "counted");
                        if result_tx.send(record).await.is_err() {
                            debug!(url = %url, "result receiver gone, record dropped");
                        }
                        Outcome::Succeeded
                    }
                    Err(e) if e.is_cancelled() => {
                        debug!(url = %url, "fetch aborted");
                        Outcome::Cancelled
                    }
                    Err(e) => {
                        warn!(url = %url, error = %e, "fetch failed, skipping");
                        Outcome::Failed
                    }
                }
            });
        }

        // Anything still queued is dropped under cancellation. Closing the
        // receiver also wakes a producer blocked on a full channel.
        work_rx.close();
        while work_rx.try_recv().is_ok() {
            report.discarded += 1;
        }
        drop(work_rx);

        if self.intake.is_cancelled() {
            info!(
                in_flight = in_flight.len(),
                "intake cancelled, waiting for dispatched workers"
            );
        }

        while let Some(joined) = in_flight.join_next().await {
            tally(&mut report, joined);
        }
        drop(result_tx);

        info!(
            dispatched = report.dispatched,
            succeeded = report.succeeded,
            failed = report.failed,
            "consumer finished"
        );
        report
    }
}

fn tally(report: &mut ConsumerReport, joined: Result<Outcome, JoinError>) {
    match joined {
        Ok(Outcome::Succeeded) => report.succeeded += 1,
        Ok(Outcome::Failed) => report.failed += 1,
        Ok(Outcome::Cancelled) => report.cancelled += 1,
        Err(e) if e.is_panic() => {
            error!(error = %e, "worker panicked");
            report.panicked += 1;
        }
        Err(_) => report.cancelled += 1,
    }
}
