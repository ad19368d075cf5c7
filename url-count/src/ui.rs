//! Output for the url-count CLI.
//!
//! Records and the total go to stdout as plain lines so they stay easy to
//! pipe. The failure summary goes to stderr and is styled with `console`,
//! which drops the colors when stderr is not a terminal.

use console::style;
use std::io::{self, Write};
use url_count_lib::{CountRecord, PipelineReport, ProducerStop};

/// Write one result line: `count for <url>: <count>`.
pub fn write_record<W: Write>(out: &mut W, record: &CountRecord) -> io::Result<()> {
    writeln!(out, "{}", record)
}

/// Write the final `total: <sum>` line.
pub fn write_total<W: Write>(out: &mut W, total: usize) -> io::Result<()> {
    writeln!(out, "total: {}", total)?;
    out.flush()
}

/// Build the stderr summary lines, if there is anything worth reporting.
pub fn summary_lines(report: &PipelineReport) -> Vec<String> {
    let consumer = &report.consumer;
    let mut lines = Vec::new();

    if consumer.failed > 0 || consumer.panicked > 0 {
        let skipped = consumer.failed + consumer.panicked;
        lines.push(format!(
            "{} of {} URLs could not be counted (see log above)",
            skipped, consumer.dispatched
        ));
    }

    if consumer.cancelled > 0 {
        lines.push(format!("{} requests aborted", consumer.cancelled));
    }

    if consumer.discarded > 0 {
        lines.push(format!(
            "{} queued URLs dropped by shutdown",
            consumer.discarded
        ));
    }

    if let Some(producer) = &report.producer {
        if let ProducerStop::ReadError(message) = &producer.stop {
            lines.push(format!(
                "input ended early after {} lines: {}",
                producer.lines_read, message
            ));
        }
    }

    lines
}

/// Print the summary to stderr.
pub fn print_summary(report: &PipelineReport) {
    for line in summary_lines(report) {
        eprintln!("{} {}", style("warning:").yellow().bold(), line);
    }
}
