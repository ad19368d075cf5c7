//! URL Count CLI Application
//!
//! Reads one URL per line from stdin (or `--file`), fetches them with a
//! bounded number of concurrent requests, and prints how many times "Go"
//! appears in each response body, followed by the total.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use futures_util::StreamExt;
use std::io;
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use url_count_lib::{
    load_env_config, CancellationToken, ConfigManager, EnvConfig, FileConfig, LineSource,
    Pipeline, PipelineConfig, ReaderLineSource, DEFAULT_CONCURRENCY, MAX_CONCURRENCY,
};

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// How long to wait on exit for a reader still blocked on stdin.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

/// CLI arguments for url-count
#[derive(Parser, Debug)]
#[command(name = "url-count")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Count occurrences of \"Go\" in the body of every URL read from stdin")]
#[command(
    long_about = "Reads one URL per line from stdin, fetches them concurrently with a bounded number of in-flight requests, and prints \"count for <url>: <count>\" as each one completes, followed by the total.\n\nFailed fetches are logged to stderr and skipped. Press Ctrl-C once to stop reading input and let in-flight requests finish; press it again to abort them."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Maximum number of concurrent requests (1-100) [default: 2]
    #[arg(short = 'c', long = "concurrency", value_name = "N", value_parser = parse_concurrency)]
    pub concurrency: Option<usize>,

    /// Read URLs from this file instead of stdin
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Debug logging (per-request detail)
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,
}

fn parse_concurrency(value: &str) -> Result<usize, String> {
    let concurrency: usize = value
        .parse()
        .map_err(|_| format!("'{}' is not a number", value))?;
    if concurrency == 0 || concurrency > MAX_CONCURRENCY {
        return Err(format!("must be between 1 and {}", MAX_CONCURRENCY));
    }
    Ok(concurrency)
}

fn main() {
    let args = Args::parse();
    init_tracing(&args);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            process::exit(1);
        }
    };

    let result = runtime.block_on(run(args));

    // After an interrupt the producer may still be parked in a stdin read.
    runtime.shutdown_timeout(SHUTDOWN_GRACE);

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_tracing(args: &Args) {
    let level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    };

    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("warn,url_count_lib={0},url_count={0}", level))
    });

    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(&args)?;
    info!(concurrency = config.concurrency, "starting url-count v{}", env!("CARGO_PKG_VERSION"));

    let source: Box<dyn LineSource> = match &args.file {
        Some(path) => Box::new(ReaderLineSource::open(path)?),
        None => Box::new(ReaderLineSource::stdin()),
    };

    let pipeline = Pipeline::http(config)?;
    spawn_interrupt_handler(pipeline.shutdown_token(), pipeline.abort_token());

    let mut run = pipeline.run(source);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    {
        let mut records = run.stream();
        while let Some(record) = records.next().await {
            if let Err(e) = ui::write_record(&mut out, &record) {
                // Nobody is reading our output any more (e.g. `| head`).
                debug!(error = %e, "stdout closed, aborting");
                drop(records);
                run.abort();
                break;
            }
        }
    }

    let report = run.finish().await?;
    if ui::write_total(&mut out, report.total).is_err() {
        debug!("stdout closed before total was written");
    }
    drop(out);

    ui::print_summary(&report);
    Ok(())
}

/// First Ctrl-C requests a graceful shutdown, the second aborts in-flight
/// requests.
fn spawn_interrupt_handler(shutdown: CancellationToken, abort: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("interrupted: finishing in-flight requests, press Ctrl-C again to abort");
        shutdown.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("aborting in-flight requests");
            abort.cancel();
        }
    });
}

/// Resolve the pipeline configuration.
///
/// Precedence order (highest to lowest):
/// 1. CLI arguments
/// 2. Environment variables (URL_COUNT_*)
/// 3. Config file (--config, URL_COUNT_CONFIG, or discovered)
/// 4. Built-in defaults
fn build_config(args: &Args) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    let verbose = args.verbose || args.debug;
    let env_config = load_env_config(verbose);

    let explicit = args.config.as_deref().or(env_config.config.as_deref());
    let file_config = ConfigManager::new(verbose).load(explicit)?;

    Ok(PipelineConfig::default().with_concurrency(resolve_concurrency(
        args,
        &env_config,
        &file_config,
    )))
}

fn resolve_concurrency(args: &Args, env_config: &EnvConfig, file_config: &FileConfig) -> usize {
    args.concurrency
        .or(env_config.concurrency)
        .or(file_config.concurrency())
        .unwrap_or(DEFAULT_CONCURRENCY)
}
