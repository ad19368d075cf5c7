//! # URL Count Library
//!
//! Reads URLs from a line source, fetches them with bounded parallelism and
//! counts occurrences of a fixed substring (`"Go"` by default) in each body.
//!
//! The pipeline has two stages joined by bounded channels:
//!
//! - a **producer** that pulls lines from a blocking [`LineSource`] and
//!   pushes them onto the work channel, and
//! - a **consumer** that admits at most N concurrent workers through a
//!   semaphore and forwards their [`CountRecord`]s to the result channel.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use url_count_lib::{Pipeline, PipelineConfig, ReaderLineSource};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = Pipeline::http(PipelineConfig::default())?;
//!     let (records, report) = pipeline.run(ReaderLineSource::stdin()).collect().await?;
//!
//!     for record in records {
//!         println!("{}", record);
//!     }
//!     println!("total: {}", report.total);
//!     Ok(())
//! }
//! ```
//!
//! Failed fetches are logged through `tracing` and skipped; they never stop
//! the pipeline.

// Re-export main public API types and functions
pub use concurrent::ConcurrentProcessor;
pub use config::{
    load_env_config, load_env_config_from, ConfigManager, EnvConfig, FileConfig, PipelineSection,
    ENV_CONCURRENCY, ENV_CONFIG,
};
pub use error::UrlCountError;
pub use pipeline::{Pipeline, PipelineRun};
pub use producer::{produce, spawn_producer};
pub use protocols::{Fetch, HttpFetcher};
pub use source::{LineSource, ReaderLineSource, MAX_LINE_BYTES};
pub use types::{
    ConsumerReport, CountRecord, PipelineConfig, PipelineReport, ProducerReport, ProducerStop,
    DEFAULT_CONCURRENCY, DEFAULT_PATTERN, MAX_CONCURRENCY,
};
pub use worker::{CountWorker, Pattern};

// Re-exported so callers don't need a direct tokio-util dependency
pub use tokio_util::sync::CancellationToken;

mod concurrent;
mod config;
mod error;
mod pipeline;
mod producer;
mod protocols;
mod source;
mod types;
mod worker;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, UrlCountError>;

