//! Logging initialization for the pinpoint binary.
//!
//! Human-readable compact output goes to stderr; the same events are written
//! as JSON lines to the log file in the data directory.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable holding the log filter (falls back to `RUST_LOG`)
pub const LOG_ENV: &str = "PINPOINT_LOG";

/// Initialize the global tracing subscriber.
///
/// Must be called exactly once. The returned guard flushes the file writer
/// when dropped, so keep it alive for the whole program.
pub fn init_logging(log_path: &Path) -> Result<WorkerGuard> {
    let directory = log_path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = log_path
        .file_name()
        .context("log path has no file name")?;

    std::fs::create_dir_all(directory)
        .with_context(|| format!("failed to create log directory {:?}", directory))?;

    let appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(build_filter())
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .with(fmt::layer().json().with_writer(writer))
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {}", e))?;

    Ok(guard)
}

fn build_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
