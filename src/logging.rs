use anyhow::Result;
use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, registry::Registry, EnvFilter};

/// Logging for server mode: daily-rotated JSON log files plus a compact
/// console layer. Returns the log directory so the caller can report it.
pub fn init_server_logging() -> Result<PathBuf> {
    let log_dir = crate::storage::get_logs_dir()?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "ragdesk.log");

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,ragdesk=info"));

    // Structured logs to file for post-hoc inspection
    let file_layer = fmt::Layer::new()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .json();

    let console_layer = fmt::Layer::new().with_target(false);

    Registry::default()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    Ok(log_dir)
}

/// Console-only logging for one-shot CLI commands
pub fn init_cli_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ragdesk=info"));

    fmt().with_env_filter(filter).with_target(false).init();
}
