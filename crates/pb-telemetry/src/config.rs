//! Telemetry configuration from environment variables.

use std::env;

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup event
    pub service_name: String,

    /// Log filter directive (trace, debug, info, warn, error, or a full
    /// `EnvFilter` directive such as `pb_messenger=debug`)
    pub log_level: String,

    /// Whether to enable JSON formatted logs
    pub json_logs: bool,

    /// Route output through the test writer so `cargo test` captures it
    pub test_writer: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "postbridge".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            test_writer: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `PB_SERVICE_NAME`: Service name (default: postbridge)
    /// - `PB_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `PB_JSON_LOGS`: Enable JSON logs (default: false)
    pub fn from_env() -> Self {
        Self {
            service_name: env::var("PB_SERVICE_NAME")
                .unwrap_or_else(|_| "postbridge".to_string()),

            log_level: env::var("PB_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            json_logs: env::var("PB_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(false),

            test_writer: false,
        }
    }

    /// Configuration for test binaries: debug output captured per test.
    pub fn for_tests() -> Self {
        Self {
            service_name: "postbridge-tests".to_string(),
            log_level: env::var("PB_LOG_LEVEL").unwrap_or_else(|_| "debug".to_string()),
            json_logs: false,
            test_writer: true,
        }
    }
}
