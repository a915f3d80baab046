//! Subscriber installation.
//!
//! Pretty output for development, JSON lines for log shippers. Installing
//! twice is not an error: the first subscriber stays in place, which lets
//! every test call `init_logging` unconditionally.

use crate::{TelemetryConfig, TelemetryError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Outcome of logging initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggingGuard {
    /// False when another subscriber was already installed
    pub installed: bool,
}

/// Install the global `tracing` subscriber described by `config`.
pub fn init_logging(config: &TelemetryConfig) -> Result<LoggingGuard, TelemetryError> {
    let env_filter = EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::Filter(e.to_string()))?;

    let result = if config.json_logs {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
    } else if config.test_writer {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_test_writer();

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
    };

    match result {
        Ok(()) => {
            tracing::info!(
                service = %config.service_name,
                level = %config.log_level,
                json_logs = config.json_logs,
                "Logging initialized"
            );
            Ok(LoggingGuard { installed: true })
        }
        // A subscriber is already set; keep it
        Err(_) => Ok(LoggingGuard { installed: false }),
    }
}
