//! Tracing subscriber setup

use crate::config::{LogFormat, LoggingSection};
use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "MORPHIR_FUNCTOR_LOG";

/// Filter from `MORPHIR_FUNCTOR_LOG`, then `RUST_LOG`, then the configured level.
pub fn env_filter(configured: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(configured))
}

/// Install the global subscriber.
///
/// Events go through a non-blocking writer; keep the returned guard alive
/// until exit so buffered lines are flushed.
pub fn init(logging: &LoggingSection, format: Option<LogFormat>) -> anyhow::Result<WorkerGuard> {
    let format = format.unwrap_or(logging.format);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(&logging.level))
        .with_target(false);

    let (writer, guard) = match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            tracing_appender::non_blocking(file)
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    let installed = match format {
        LogFormat::Json => builder.json().with_writer(writer).try_init(),
        LogFormat::Pretty => builder.with_writer(writer).try_init(),
    };
    installed
        .map_err(|err| anyhow::anyhow!(err))
        .context("failed to install tracing subscriber")?;
    Ok(guard)
}
