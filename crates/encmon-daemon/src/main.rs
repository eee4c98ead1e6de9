//! Encoder monitor daemon entry point.
//!
//! Integrates the register poller, the memory-mapped count source, and
//! signal handling into a complete monitor that reports encoder count
//! changes on standard output.

mod signals;

use anyhow::{Context, Result};
use clap::Parser;
use encmon_common::config::MonitorConfig;
use encmon_runtime::poller::Poller;
use encmon_runtime::{CountSource, EncoderRegister, SimulatedEncoder};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::signals::SignalHandler;

/// Encoder monitor command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "encmon-daemon",
    about = "Encoder monitor daemon - reports FPGA count register changes",
    version,
    long_about = None
)]
struct Args {
    /// Path to a monitor configuration file (TOML).
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Physical-memory device to map (overrides config file).
    #[arg(long, short = 'd', value_name = "PATH")]
    device: Option<PathBuf>,

    /// Poll interval, e.g. "50ms" (overrides config file).
    #[arg(long, short = 'i', value_name = "DURATION", value_parser = humantime::parse_duration)]
    interval: Option<Duration>,

    /// Run against a simulated encoder (no hardware access).
    #[arg(long, short = 's')]
    simulated: bool,

    /// Maximum polls to run (0 = until a shutdown signal).
    #[arg(long, default_value = "0")]
    max_polls: u64,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting encoder monitor");

    // Load configuration
    let mut config = load_config(&args)?;

    // Override with command-line arguments
    if let Some(device) = &args.device {
        config.device = device.clone();
    }
    if let Some(interval) = args.interval {
        config.poll_interval = interval;
    }

    info!(?config.poll_interval, ?config.device, "Configuration loaded");

    // Set up signal handling
    let signal_handler = SignalHandler::new().context("Failed to set up signal handlers")?;

    if args.simulated {
        info!("Using simulated encoder");
        let source = SimulatedEncoder::free_running(1, 4);
        run_monitor(source, &config, &signal_handler, args.max_polls)
    } else {
        run_hardware(&config, &signal_handler, args.max_polls)
    }
}

/// Initialize logging with the specified log level.
///
/// Log records go to stderr so that stdout carries only count reports.
fn init_logging(level: &str) {
    let filter = format!(
        "encmon_daemon={},encmon_runtime={},encmon_common={}",
        level, level, level
    );

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .init();
}

/// Load configuration from file or use defaults.
///
/// Resolution priority (first existing file wins):
/// 1. Command-line `--config` argument
/// 2. `ENCMON_CONFIG` environment variable
/// 3. `/etc/encmon/config.toml` (system path)
/// 4. `config/default.toml` (local development)
/// 5. Built-in defaults
fn load_config(args: &Args) -> Result<MonitorConfig> {
    // 1. Command-line argument (highest priority)
    if let Some(config_path) = &args.config {
        info!(?config_path, "Loading config from command-line argument");
        return MonitorConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path));
    }

    // 2. Environment variable
    if let Ok(env_path) = std::env::var("ENCMON_CONFIG") {
        let config_path = PathBuf::from(&env_path);
        if config_path.exists() {
            info!(?config_path, "Loading config from ENCMON_CONFIG");
            return MonitorConfig::from_file(&config_path)
                .with_context(|| format!("Failed to load config from ENCMON_CONFIG={:?}", env_path));
        }
        warn!(
            path = %env_path,
            "ENCMON_CONFIG set but file does not exist, checking other locations"
        );
    }

    // 3. System path
    let system_path = PathBuf::from("/etc/encmon/config.toml");
    if system_path.exists() {
        info!(?system_path, "Loading config from system path");
        return MonitorConfig::from_file(&system_path)
            .with_context(|| format!("Failed to load config from {:?}", system_path));
    }

    // 4. Local development path
    let local_path = PathBuf::from("config/default.toml");
    if local_path.exists() {
        info!(?local_path, "Loading config from local path");
        return MonitorConfig::from_file(&local_path)
            .with_context(|| format!("Failed to load config from {:?}", local_path));
    }

    // 5. Built-in defaults
    info!("No config file found, using built-in defaults");
    Ok(MonitorConfig::default())
}

/// Open the hardware count register and run the monitor against it.
fn run_hardware(
    config: &MonitorConfig,
    signal_handler: &SignalHandler,
    max_polls: u64,
) -> Result<()> {
    // Opening /dev/mem needs root on stock kernels
    #[cfg(unix)]
    {
        // SAFETY: geteuid has no preconditions and cannot fail
        if unsafe { libc::geteuid() } != 0 {
            warn!("Not running as root, opening the physical memory device will likely fail");
        }
    }

    let source = EncoderRegister::open(&config.device)
        .with_context(|| format!("Failed to open encoder register via {:?}", config.device))?;

    run_monitor(source, config, signal_handler, max_polls)
}

/// Run the monitor poll loop.
///
/// Polls the count source at the configured interval, prints
/// `Count: <n>` on stdout whenever the value changes, and releases the
/// source when a shutdown signal arrives or the poll budget runs out.
fn run_monitor<S: CountSource>(
    source: S,
    config: &MonitorConfig,
    signal_handler: &SignalHandler,
    max_polls: u64,
) -> Result<()> {
    let mut poller = Poller::new(source, config);

    info!(
        interval_ms = config.poll_interval.as_millis(),
        max_polls,
        "Entering poll loop"
    );

    let mut run_error: Option<anyhow::Error> = None;

    loop {
        // Check for shutdown signal
        if signal_handler.shutdown_requested() {
            info!("Shutdown requested, leaving poll loop");
            break;
        }

        let cycle = match poller.poll_cycle() {
            Ok(cycle) => cycle,
            Err(e) => {
                error!("Register poll failed: {}", e);
                signal_handler.request_shutdown();
                run_error = Some(anyhow::Error::new(e).context("Register poll failed"));
                break;
            }
        };

        // Count reports are the monitor's output, not log records
        if cycle.changed {
            println!("Count: {}", cycle.count);
        }

        if cycle.overrun {
            warn!(
                poll = cycle.poll_index,
                read_us = cycle.read_time.as_micros(),
                "Register read outlasted the poll interval"
            );
        }

        // Check poll budget
        if max_polls > 0 && cycle.poll_index >= max_polls {
            info!(polls = cycle.poll_index, "Maximum poll count reached");
            signal_handler.request_shutdown();
            break;
        }

        // Periodic status logging (every 1200 polls, one minute at the
        // default interval)
        if cycle.poll_index % 1200 == 0 {
            let metrics = poller.metrics();
            info!(
                polls = metrics.total_polls(),
                changes = metrics.change_count(),
                avg_read_us = metrics.read_mean().map(|d| d.as_micros()).unwrap_or(0),
                overruns = metrics.overrun_count(),
                "Periodic status"
            );
        }

        poller.wait_interval();
    }

    // Graceful shutdown
    info!("Shutting down...");

    if let Err(e) = poller.source.shutdown() {
        error!("Failed to release the register window: {}", e);
        if run_error.is_none() {
            run_error =
                Some(anyhow::Error::new(e).context("Failed to release the register window"));
        }
    }

    // Final statistics
    let snapshot = poller.metrics().snapshot();
    info!(
        total_polls = snapshot.total_polls,
        changes = snapshot.change_count,
        overruns = snapshot.overrun_count,
        signals = signal_handler.state().signal_count(),
        "Monitor shutdown complete"
    );

    match run_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
