//! Producer stage.
//!
//! Bridges a blocking [`LineSource`] into the async pipeline. The loop runs on
//! tokio's blocking pool and pushes each line onto the bounded work channel,
//! waiting whenever the channel is full.

use crate::source::LineSource;
use crate::types::{ProducerReport, ProducerStop};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Spawn the producer on the blocking pool.
///
/// The work channel is closed exactly once, when `work_tx` is dropped at the
/// end of the task.
pub fn spawn_producer<S: LineSource>(
    source: S,
    work_tx: mpsc::Sender<String>,
    intake: CancellationToken,
) -> JoinHandle<ProducerReport> {
    tokio::task::spawn_blocking(move || produce(source, work_tx, intake))
}

/// Run the producer loop on the current thread until the source is exhausted,
/// intake is cancelled, or the consumer goes away.
///
/// Must not be called from inside an async context: pushes use
/// `blocking_send`.
pub fn produce<S: LineSource>(
    mut source: S,
    work_tx: mpsc::Sender<String>,
    intake: CancellationToken,
) -> ProducerReport {
    let mut lines_read = 0;

    let stop = loop {
        if intake.is_cancelled() {
            break ProducerStop::Cancelled;
        }

        let url = match source.next_line() {
            Ok(Some(url)) => url,
            Ok(None) => break ProducerStop::EndOfInput,
            Err(e) => {
                warn!(error = %e, lines_read, "input failed, treating as end of input");
                break ProducerStop::ReadError(e.to_string());
            }
        };

        debug!(url = %url, "queued");
        if work_tx.blocking_send(url).is_err() {
            break ProducerStop::Closed;
        }
        lines_read += 1;
    };

    drop(work_tx);

    let report = ProducerReport {
        lines_read,
        skipped: source.skipped(),
        stop,
    };
    info!(lines_read, skipped = report.skipped, stop = %report.stop, "producer finished");
    report
}
