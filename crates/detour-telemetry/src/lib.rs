//! Tracing setup shared by the Detour binaries.

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable, one event per line.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to bridge log records: {0}")]
    LogBridge(#[from] tracing_log::log::SetLoggerError),
    #[error("failed to install subscriber: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Installs the global subscriber, writing to stderr.
///
/// The filter comes from `RUST_LOG`, falling back to [`DEFAULT_FILTER`].
pub fn init(format: LogFormat) -> Result<(), TelemetryError> {
    tracing_log::LogTracer::init()?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.finish())?,
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
    }

    Ok(())
}
