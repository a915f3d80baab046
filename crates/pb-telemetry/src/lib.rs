//! # PostBridge Telemetry
//!
//! Structured logging setup shared by applications and tests embedding the
//! messenger. The messenger itself only emits `tracing` events; installing
//! a subscriber is left to whoever owns the process.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pb_telemetry::{init_logging, TelemetryConfig};
//!
//! init_logging(&TelemetryConfig::from_env())?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PB_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `PB_JSON_LOGS` | `false` | Emit JSON lines instead of pretty output |
//! | `PB_SERVICE_NAME` | `postbridge` | Service name attached to the startup event |

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::{init_logging, LoggingGuard};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    Filter(String),
}
