//! Pipeline assembly.
//!
//! A [`Pipeline`] owns its configuration, fetcher and cancellation tokens.
//! [`Pipeline::run`] wires a line source through the producer and consumer
//! stages and returns a [`PipelineRun`] the caller drains for records.
//!
//! Cancellation has two levels:
//! - shutdown stops reading input and dispatching work; workers already
//!   dispatched finish and their records are still delivered.
//! - abort does the same and also drops in-flight fetches.

use crate::concurrent::ConcurrentProcessor;
use crate::error::UrlCountError;
use crate::producer::spawn_producer;
use crate::protocols::{Fetch, HttpFetcher};
use crate::source::LineSource;
use crate::types::{
    ConsumerReport, CountRecord, PipelineConfig, PipelineReport, ProducerReport, MAX_CONCURRENCY,
};
use crate::worker::{CountWorker, Pattern};
use futures_util::stream::{self, Stream};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::error;

/// How long `finish` waits for a producer that may be parked in a blocking
/// read after shutdown.
const PRODUCER_GRACE: Duration = Duration::from_millis(100);

/// A configured, not yet started pipeline.
///
/// # Example
///
/// ```rust,no_run
/// use url_count_lib::{Pipeline, PipelineConfig, ReaderLineSource};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pipeline = Pipeline::http(PipelineConfig::default().with_concurrency(4))?;
///     let mut run = pipeline.run(ReaderLineSource::stdin());
///
///     while let Some(record) = run.recv().await {
///         println!("{}", record);
///     }
///     let report = run.finish().await?;
///     println!("total: {}", report.total);
///     Ok(())
/// }
/// ```
pub struct Pipeline<F> {
    config: PipelineConfig,
    fetcher: F,
    pattern: Pattern,
    abort: CancellationToken,
    intake: CancellationToken,
}

impl Pipeline<HttpFetcher> {
    /// Pipeline that fetches over HTTP.
    pub fn http(config: PipelineConfig) -> Result<Self, UrlCountError> {
        Self::new(config, HttpFetcher::new()?)
    }
}

impl<F: Fetch> Pipeline<F> {
    /// Create a pipeline with a custom fetcher.
    ///
    /// Fails if the configured pattern is empty.
    pub fn new(config: PipelineConfig, fetcher: F) -> Result<Self, UrlCountError> {
        let pattern = Pattern::new(&config.pattern)?;
        let config = PipelineConfig {
            concurrency: config.concurrency.clamp(1, MAX_CONCURRENCY),
            ..config
        };
        let abort = CancellationToken::new();
        let intake = abort.child_token();

        Ok(Self {
            config,
            fetcher,
            pattern,
            abort,
            intake,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Token that triggers a graceful shutdown when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.intake.clone()
    }

    /// Token that aborts in-flight fetches when cancelled. Cancelling it also
    /// cancels the shutdown token.
    pub fn abort_token(&self) -> CancellationToken {
        self.abort.clone()
    }

    /// Start both stages. Must be called inside a tokio runtime.
    pub fn run<S: LineSource>(self, source: S) -> PipelineRun {
        let capacity = self.config.concurrency;
        let (work_tx, work_rx) = mpsc::channel(capacity);
        let (result_tx, result_rx) = mpsc::channel(capacity);

        let worker = CountWorker::new(self.fetcher, self.pattern, self.abort.clone());
        let processor = ConcurrentProcessor::new(worker, capacity, self.intake.clone());

        let producer = spawn_producer(source, work_tx, self.intake.clone());
        let consumer = processor.spawn(work_rx, result_tx);

        PipelineRun {
            results: result_rx,
            producer,
            consumer,
            intake: self.intake,
            abort: self.abort,
            received: 0,
            total: 0,
        }
    }
}

/// Handle to a running pipeline.
///
/// Records arrive in completion order, not input order. The result channel
/// closes once input is exhausted (or shutdown was requested) and every
/// dispatched worker has finished.
pub struct PipelineRun {
    results: mpsc::Receiver<CountRecord>,
    producer: JoinHandle<ProducerReport>,
    consumer: JoinHandle<ConsumerReport>,
    intake: CancellationToken,
    abort: CancellationToken,
    received: usize,
    total: usize,
}

impl PipelineRun {
    /// Next record, or `None` once the result channel is closed and drained.
    pub async fn recv(&mut self) -> Option<CountRecord> {
        let record = self.results.recv().await?;
        self.note(&record);
        Some(record)
    }

    /// Records as a stream. Totals are tracked the same way as [`recv`](Self::recv).
    pub fn stream(&mut self) -> impl Stream<Item = CountRecord> + '_ {
        stream::poll_fn(move |cx| self.poll_recv(cx))
    }

    fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<Option<CountRecord>> {
        let polled = self.results.poll_recv(cx);
        if let Poll::Ready(Some(record)) = &polled {
            self.note(record);
        }
        polled
    }

    fn note(&mut self, record: &CountRecord) {
        self.received += 1;
        self.total += record.count;
    }

    /// Sum of counts received so far.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of records received so far.
    pub fn received(&self) -> usize {
        self.received
    }

    /// Stop reading input and dispatching work; let dispatched workers finish.
    pub fn shutdown(&self) {
        self.intake.cancel();
    }

    /// Shut down and drop in-flight fetches.
    pub fn abort(&self) {
        self.abort.cancel();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.intake.is_cancelled()
    }

    /// Wait for both stages and return the combined report.
    ///
    /// Records the caller has not received yet are drained and counted in the
    /// report but not returned; use [`collect`](Self::collect) to keep them.
    pub async fn finish(mut self) -> Result<PipelineReport, UrlCountError> {
        while self.recv().await.is_some() {}

        let consumer = (&mut self.consumer)
            .await
            .map_err(|e| UrlCountError::internal(format!("Consumer task failed: {}", e)))?;

        let producer = if self.intake.is_cancelled() {
            // A producer blocked in a read can't observe the token.
            match tokio::time::timeout(PRODUCER_GRACE, &mut self.producer).await {
                Ok(joined) => producer_report(joined),
                Err(_) => None,
            }
        } else {
            producer_report((&mut self.producer).await)
        };

        Ok(PipelineReport {
            producer,
            consumer,
            records: self.received,
            total: self.total,
        })
    }

    /// Drain every remaining record, then finish.
    pub async fn collect(mut self) -> Result<(Vec<CountRecord>, PipelineReport), UrlCountError> {
        let mut records = Vec::new();
        while let Some(record) = self.recv().await {
            records.push(record);
        }
        let report = self.finish().await?;
        Ok((records, report))
    }
}

fn producer_report(
    joined: Result<ProducerReport, tokio::task::JoinError>,
) -> Option<ProducerReport> {
    match joined {
        Ok(report) => Some(report),
        Err(e) => {
            error!(error = %e, "producer task failed");
            None
        }
    }
}
