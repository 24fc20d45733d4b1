//! Process-wide logging setup.
//!
//! Library code logs through both `log` and `tracing`; the `log` records
//! are forwarded into the tracing subscriber.

use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

use crate::error::MailsiftError;

/// Output format for log records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Builds the filter from `RUST_LOG`, falling back to `info`.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber. Call once, early in `main`. Records go
/// to stderr so stdout stays free for reports.
pub fn init_tracing(format: LogFormat) -> Result<(), MailsiftError> {
    let registry = Registry::default().with(env_filter());

    let installed = match format {
        LogFormat::Pretty => {
            tracing::subscriber::set_global_default(registry.with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            ))
        }
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().json().with_writer(std::io::stderr)),
        ),
    };
    installed.map_err(|e| MailsiftError::Telemetry(e.to_string()))?;

    tracing_log::LogTracer::init().map_err(|e| MailsiftError::Telemetry(e.to_string()))?;

    Ok(())
}
