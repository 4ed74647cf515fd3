//! rtprobe entry point.
//!
//! Wires the real-time context, periodic runner, and report rendering into
//! the full demonstration: configure → run → report → release. Exit code is
//! 0 on success (and for `--help`), 1 when real-time configuration fails
//! fatally, non-zero for unrecognized arguments.

mod report;

use anyhow::{Context, Result};
use clap::Parser;
use rtprobe_common::config::ProbeConfig;
use rtprobe_common::histogram::Histogram;
use rtprobe_common::stats::{percentile, LatencyStats};
use rtprobe_runtime::clock::MonotonicClock;
use rtprobe_runtime::realtime::RtContext;
use rtprobe_runtime::runner::PeriodicRunner;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use crate::report::{render_banner, Report};

/// rtprobe command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "rtprobe",
    about = "Measures periodic wake latency under real-time scheduling \
             (mlockall + SCHED_FIFO + CPU pinning)",
    version,
    long_about = None
)]
struct Args {
    /// Path to a configuration file (TOML).
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Period of the measured task (e.g. "1ms", "500us").
    #[arg(long, short = 'p', value_name = "DURATION", value_parser = humantime::parse_duration)]
    period: Option<Duration>,

    /// Number of periodic cycles to execute.
    #[arg(long, short = 'n', value_name = "COUNT")]
    iterations: Option<u32>,

    /// Real-time scheduling priority (1-99).
    #[arg(long, value_name = "PRIO")]
    priority: Option<u8>,

    /// CPU to pin the measuring thread to.
    #[arg(long, value_name = "CPU")]
    cpu: Option<usize>,

    /// Skip real-time setup (unprivileged smoke run, no latency guarantees).
    #[arg(long)]
    no_rt: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, short = 'l', default_value = "warn")]
    log_level: String,
}

fn main() -> Result<()> {
    // Help and version exit 0; any usage error (unknown flag, bad value)
    // prints usage and exits 1
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            std::process::exit(i32::from(e.use_stderr()));
        }
    };

    init_logging(&args.log_level);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting rtprobe");

    let config = load_config(&args)?;
    let config = apply_overrides(config, &args);

    run_probe(&config)
}

/// Initialize logging with the specified log level.
fn init_logging(level: &str) {
    let filter = format!("rtprobe={level},rtprobe_runtime={level},rtprobe_common={level}");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&filter)),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Load configuration from file or use defaults.
///
/// Resolution priority (first existing source wins):
/// 1. Command-line `--config` argument
/// 2. `RTPROBE_CONFIG` environment variable
/// 3. `rtprobe.toml` in the working directory
/// 4. Built-in defaults
fn load_config(args: &Args) -> Result<ProbeConfig> {
    if let Some(config_path) = &args.config {
        info!(?config_path, "Loading config from command-line argument");
        return ProbeConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {config_path:?}"));
    }

    if let Ok(env_path) = std::env::var("RTPROBE_CONFIG") {
        let config_path = PathBuf::from(&env_path);
        if config_path.exists() {
            info!(?config_path, "Loading config from RTPROBE_CONFIG");
            return ProbeConfig::from_file(&config_path).with_context(|| {
                format!("Failed to load config from RTPROBE_CONFIG={env_path:?}")
            });
        }
        warn!(
            path = %env_path,
            "RTPROBE_CONFIG set but file does not exist, checking other locations"
        );
    }

    let local_path = PathBuf::from("rtprobe.toml");
    if local_path.exists() {
        info!(?local_path, "Loading config from local path");
        return ProbeConfig::from_file(&local_path)
            .with_context(|| format!("Failed to load config from {local_path:?}"));
    }

    info!("No config file found, using built-in defaults");
    Ok(ProbeConfig::default())
}

/// Apply command-line overrides on top of the loaded configuration.
fn apply_overrides(mut config: ProbeConfig, args: &Args) -> ProbeConfig {
    if let Some(period) = args.period {
        config.period = period;
    }
    if let Some(iterations) = args.iterations {
        config.iterations = iterations;
    }
    if let Some(priority) = args.priority {
        config.realtime.priority = priority;
    }
    if let Some(cpu) = args.cpu {
        config.realtime.cpu = Some(cpu);
    }
    if args.no_rt {
        config.realtime.enabled = false;
    }
    config
}

/// Execute the full demonstration: configure, run, report, release.
fn run_probe(config: &ProbeConfig) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    render_banner(config, &mut out).context("Failed to write banner")?;

    // Real-time context must be fully established (or have explicitly
    // failed) before the loop starts; its Drop releases on every exit path.
    let mut ctx = RtContext::new();
    let rt_status = ctx
        .configure(&config.realtime)
        .context("Real-time configuration failed")?;

    let runner = PeriodicRunner::new(config.period, config.iterations);
    let clock = MonotonicClock::new();

    writeln!(out, "\nRunning {} cycles...", config.iterations)?;
    let samples = runner.run_with_progress(&clock, |cycle, latency_ns| {
        let _ = writeln!(
            out,
            "  cycle {cycle:>6}/{} - latency {:>6} us",
            config.iterations,
            latency_ns / 1000
        );
    });

    // The loop is complete; drop RT scheduling before the (non-critical)
    // analysis and rendering work.
    ctx.release();

    let stats = LatencyStats::compute(&samples);
    let histogram = Histogram::build(
        &samples,
        config.report.histogram_bins,
        config.report.max_bar_width,
    );
    let percentiles = compute_percentiles(&samples, &config.report.percentiles);

    let report = Report {
        stats,
        histogram,
        percentiles,
        rt_status,
        sample_count: samples.len(),
    };
    report.render(&mut out).context("Failed to write report")?;

    info!(
        samples = samples.len(),
        max_ns = stats.max_ns,
        "Run complete"
    );
    Ok(())
}

/// Compute the configured extra percentiles over a sorted copy of `samples`.
fn compute_percentiles(samples: &[u64], requested: &[f64]) -> Vec<(f64, u64)> {
    if requested.is_empty() || samples.is_empty() {
        return vec![];
    }

    // One copy, sorted once; `percentile` re-sorting a sorted slice is cheap
    let mut sorted = samples.to_vec();
    requested
        .iter()
        .filter(|p| p.is_finite() && (0.0..=100.0).contains(*p))
        .map(|&p| (p, percentile(&mut sorted, p)))
        .collect()
}
