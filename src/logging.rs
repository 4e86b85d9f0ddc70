//! Logging configuration using the tracing ecosystem.
//!
//! Logs go to a daily-rotated file so the terminal UI is never written
//! over. The level is taken from `RUST_LOG`.

use std::path::PathBuf;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Default log level if RUST_LOG is not set.
const DEFAULT_LOG_FILTER: &str = "canagrosa_admin=info,canagrosa=info,warn";

const LOG_FILE_PREFIX: &str = "canagrosa.log";

/// Initialize the logging system.
///
/// # Log Directory
///
/// - Linux: `~/.local/share/canagrosa/logs/`
/// - macOS: `~/Library/Application Support/canagrosa/logs/`
/// - Windows: `C:\Users\<User>\AppData\Local\canagrosa\logs\`
///
/// # Log Levels
///
/// - `RUST_LOG=canagrosa_admin=debug` - table and API decisions
/// - `RUST_LOG=canagrosa_admin=trace` - every scroll and drag event
///
/// # Errors
///
/// Returns an error if the log directory cannot be determined or created,
/// or if a global subscriber is already set.
pub fn init() -> anyhow::Result<()> {
    let log_dir = get_log_directory()?;
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_PREFIX);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let subscriber = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(filter);

    tracing::subscriber::set_global_default(subscriber)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "canagrosa starting up");
    tracing::debug!(log_dir = %log_dir.display(), "Log directory");

    Ok(())
}

fn get_log_directory() -> anyhow::Result<PathBuf> {
    let base_dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine local data directory"))?;

    Ok(base_dir.join("canagrosa").join("logs"))
}

/// Where logs are written, for the help screen.
pub fn log_directory() -> Option<PathBuf> {
    get_log_directory().ok()
}

/// Log application shutdown.
pub fn shutdown() {
    tracing::info!("canagrosa shutting down");
}
