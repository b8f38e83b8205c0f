//! joyhub - game controller input normalization
//!
//! Monitors connected controllers, replays recorded input scenarios and
//! prints platform diagnostics.

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use joyhub::cli;
use joyhub::config::AppConfig;
use joyhub::input::joystick::{print_joystick_diagnostics, Scenario};
use joyhub::paths::AppPaths;

/// joyhub - Normalize game controller input into joystick slots
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace), overrides the config file
    #[arg(short, long, env = "LOG_LEVEL")]
    log_level: Option<String>,

    /// Print controller diagnostics and exit
    #[arg(long)]
    diagnostics: bool,

    /// Replay a scenario file and print the resulting slots
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Print slots as JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let paths = AppPaths::detect(args.config.as_deref());
    let config = if paths.config.exists() {
        AppConfig::load(&paths.config.to_string_lossy()).await?
    } else {
        AppConfig::default()
    };

    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    let log_dir = paths.log_dir(config.logging.directory.as_deref());
    let _log_guard = init_logging(&level, &log_dir)?;

    info!("Starting joyhub v{}...", env!("CARGO_PKG_VERSION"));
    if paths.config.exists() {
        info!("Configuration file: {}", paths.config.display());
    } else {
        info!(
            "No configuration at {}, using defaults",
            paths.config.display()
        );
    }
    info!("Logging to {}", log_dir.display());

    if args.diagnostics {
        print_joystick_diagnostics();
        return Ok(());
    }

    if let Some(replay) = &args.replay {
        let scenario = Scenario::load(&replay.to_string_lossy()).await?;
        let slots = scenario.run(&config.joystick).await?;
        cli::print_slots(&slots, args.json)?;
        return Ok(());
    }

    run_monitor(config, args.json).await?;

    info!("joyhub shutdown complete");
    Ok(())
}

#[cfg(windows)]
async fn run_monitor(config: AppConfig, json: bool) -> Result<()> {
    use joyhub::input::joystick::xinput::{spawn_presence_watcher, XInputPlatform};
    use joyhub::JoystickProvider;
    use std::time::Duration;
    use tokio::sync::mpsc;

    let mut provider = JoystickProvider::start(config.joystick.clone(), XInputPlatform::load)?;
    let handle = provider.handle();

    let (watcher_tx, watcher_rx) = mpsc::channel::<()>(1);
    let watcher = spawn_presence_watcher(
        provider.events(),
        Duration::from_millis(500),
        watcher_rx,
    )?;

    info!("Monitoring controllers (Ctrl+C to stop)...");

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    let mut refresh = tokio::time::interval(Duration::from_secs(1));

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = refresh.tick() => {
                cli::print_slots(&handle.slots(), json)?;
            }
        }
    }

    let _ = watcher_tx.try_send(());
    if watcher.join().is_err() {
        tracing::warn!("XInput presence watcher panicked");
    }
    provider.shutdown()?;

    Ok(())
}

#[cfg(not(windows))]
async fn run_monitor(_config: AppConfig, _json: bool) -> Result<()> {
    anyhow::bail!(
        "Live monitoring needs the XInput backend, which is only available on Windows. \
         Use --replay <file> to run a recorded scenario."
    )
}

/// Set up console logging plus a daily rolling file in `directory`
///
/// The returned guard must stay alive for the file writer to flush.
fn init_logging(level: &str, directory: &Path) -> Result<WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    AppPaths::ensure_dir(directory)?;
    let appender = tracing_appender::rolling::daily(directory, "joyhub.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(true)
                .with_file(false)
                .with_line_number(false),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(writer),
        )
        .init();

    Ok(guard)
}

#[cfg(windows)]
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
