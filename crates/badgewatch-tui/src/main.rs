//! `badgewatch-tui` — live terminal view of BLE badge presence.
//!
//! Runs the same ingestion pipeline as `badgewatch serve` and redraws when
//! the registry changes, plus every `tui.refresh_ms` so ages keep moving.
//! Logs go to a file (default `/tmp/badgewatch-tui.log`) so they never
//! corrupt the terminal. Frames come from `-f`, a pipe on stdin, or the
//! configured file/TCP source.

mod app;
mod event;
mod theme;
mod widgets;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use badgewatch_config::load_config;
use badgewatch_core::{LineSource, Monitor, SourceSpec};

use crate::app::App;

/// Terminal dashboard for BLE badge presence.
#[derive(Parser, Debug)]
#[command(name = "badgewatch-tui", version, about)]
struct Cli {
    /// Config file (default: platform config dir)
    #[arg(long, env = "BADGEWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Read frames from this JSON-lines file instead of the configured source
    #[arg(short = 'f', long)]
    file: Option<PathBuf>,

    /// Log file path
    #[arg(long, default_value = "/tmp/badgewatch-tui.log")]
    log_file: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Set up file-based tracing. Logging to stdout/stderr would corrupt the
/// TUI. The returned guard must be held so logs are flushed on exit.
fn setup_tracing(cli: &Cli) -> WorkerGuard {
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "badgewatch_tui={log_level},badgewatch_core={log_level}"
        ))
    });

    let log_dir = cli
        .log_file
        .parent()
        .unwrap_or(std::path::Path::new("/tmp"));
    let log_filename = cli
        .log_file
        .file_name()
        .unwrap_or(std::ffi::OsStr::new("badgewatch-tui.log"));

    let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true),
        )
        .init();

    guard
}

/// How long runtime teardown may wait on a frame read that is still
/// parked on the blocking pool (stdin reads cannot be cancelled).
const SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Install the error hook BEFORE entering the terminal; ratatui chains
    // its restoring panic hook in front of it.
    color_eyre::install()?;

    let log_guard = setup_tracing(&cli);

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run(cli));
    runtime.shutdown_timeout(SHUTDOWN_GRACE);

    drop(log_guard);
    result
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let spec = match cli.file {
        Some(path) => SourceSpec::File(path),
        // Keys come from the terminal; frames must come from elsewhere.
        None => config.frame_source(std::io::stdin().is_terminal())?,
    };

    let monitor = Monitor::new(config.monitor_config()?)?;
    monitor.start().await;
    info!(source = %spec, "starting badgewatch-tui");
    let scanner = monitor.spawn_scanner(LineSource::new(spec));

    let mut app = App::new(monitor.clone(), config.tui_refresh());
    let mut terminal = ratatui::try_init()?;
    let result = app.run(&mut terminal).await;
    ratatui::restore();

    monitor.shutdown().await;
    match scanner.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "scanner ended with an error"),
        Err(e) => warn!(error = %e, "scanner task ended abnormally"),
    }

    result
}
