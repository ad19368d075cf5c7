//! Core data types for the fetch-and-count pipeline.
//!
//! This module defines the records that flow out of the pipeline, the
//! configuration passed into it, and the reports each stage returns when it
//! finishes.

use std::fmt;

/// Default number of concurrent workers.
pub const DEFAULT_CONCURRENCY: usize = 2;

/// Upper bound accepted for the concurrency limit.
pub const MAX_CONCURRENCY: usize = 100;

/// Substring counted in every response body.
pub const DEFAULT_PATTERN: &str = "Go";

/// Result of counting the pattern in one fetched URL.
///
/// Produced exactly once per successfully fetched input line and never for
/// a failed fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CountRecord {
    /// The URL exactly as it appeared on its input line
    pub url: String,

    /// Non-overlapping occurrences of the pattern in the response body
    pub count: usize,
}

impl CountRecord {
    pub fn new<U: Into<String>>(url: U, count: usize) -> Self {
        Self {
            url: url.into(),
            count,
        }
    }
}

impl fmt::Display for CountRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "count for {}: {}", self.url, self.count)
    }
}

/// Configuration for one pipeline instance.
///
/// Each `Pipeline` owns its own copy, so independent pipelines with
/// different limits can run side by side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Maximum number of workers fetching at once. Also the capacity of the
    /// work and result channels.
    /// Default: 2, Range: 1-100
    pub concurrency: usize,

    /// Substring to count in each body.
    /// Default: "Go"
    pub pattern: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            pattern: DEFAULT_PATTERN.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Set the concurrency limit, clamped to 1-100.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, MAX_CONCURRENCY);
        self
    }

    pub fn with_pattern<P: Into<String>>(mut self, pattern: P) -> Self {
        self.pattern = pattern.into();
        self
    }
}

/// Why the producer stopped reading input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProducerStop {
    /// The line source reported end-of-stream
    EndOfInput,

    /// The intake token was cancelled before the next read
    Cancelled,

    /// The line source failed; treated as end of input
    ReadError(String),

    /// The work channel receiver went away (consumer stopped early)
    Closed,
}

impl fmt::Display for ProducerStop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProducerStop::EndOfInput => write!(f, "end of input"),
            ProducerStop::Cancelled => write!(f, "cancelled"),
            ProducerStop::ReadError(message) => write!(f, "read error: {}", message),
            ProducerStop::Closed => write!(f, "consumer closed"),
        }
    }
}

/// Summary returned by the producer stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerReport {
    /// Lines pushed onto the work channel
    pub lines_read: usize,

    /// Blank and comment lines the source skipped
    pub skipped: usize,

    pub stop: ProducerStop,
}

/// Summary returned by the consumer stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumerReport {
    /// Work items handed to a worker task
    pub dispatched: usize,

    /// Workers that produced a record
    pub succeeded: usize,

    /// Workers whose fetch failed (logged and skipped)
    pub failed: usize,

    /// Workers that panicked
    pub panicked: usize,

    /// Workers whose fetch was dropped by an abort
    pub cancelled: usize,

    /// Items taken off the work channel but never dispatched because intake
    /// was cancelled
    pub discarded: usize,
}

/// Combined report for a finished pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    /// `None` when the producer was still parked in a blocking read after
    /// a shutdown
    pub producer: Option<ProducerReport>,

    pub consumer: ConsumerReport,

    /// Records received by the caller through the run handle
    pub records: usize,

    /// Sum of counts over those records
    pub total: usize,
}

impl PipelineReport {
    /// Whether any URL failed to produce a record.
    pub fn has_failures(&self) -> bool {
        self.consumer.failed > 0 || self.consumer.panicked > 0
    }
}
