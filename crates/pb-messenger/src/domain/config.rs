//! Messenger configuration with validation.
//!
//! Budgets are plain milliseconds so configs stay readable in files and
//! environment variables. A response budget of `-1` means unbounded.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Sentinel for "never times out" in millisecond settings.
pub const UNBOUNDED_MS: i64 = -1;

/// Response budget for a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseTimeout {
    Bounded(Duration),
    Unbounded,
}

impl ResponseTimeout {
    /// Interpret a millisecond setting: `-1` is unbounded, positive is bounded.
    pub fn from_millis(ms: i64) -> Option<Self> {
        match ms {
            UNBOUNDED_MS => Some(ResponseTimeout::Unbounded),
            ms if ms > 0 => Some(ResponseTimeout::Bounded(Duration::from_millis(ms as u64))),
            _ => None,
        }
    }

    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            ResponseTimeout::Bounded(budget) => Some(*budget),
            ResponseTimeout::Unbounded => None,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, ResponseTimeout::Unbounded)
    }
}

/// Messenger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessengerConfig {
    /// Granularity of the timeout loop, shared by both phases.
    pub tick_interval_ms: u64,
    /// Ack budget for endpoints without a prior successful exchange.
    pub ack_timeout_ms: u64,
    /// Ack budget for endpoints that have answered before.
    pub known_ack_timeout_ms: u64,
    /// Default response budget (`-1` = unbounded).
    pub response_timeout_ms: i64,
    /// Budget for the greeting of a contained endpoint.
    pub child_handshake_timeout_ms: u64,
    /// Budget for the greeting that resolves a set/regex origin pattern.
    pub handshake_timeout_ms: u64,
}

impl Default for MessengerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 500,
            ack_timeout_ms: 2_000,
            known_ack_timeout_ms: 10_000,
            response_timeout_ms: UNBOUNDED_MS,
            child_handshake_timeout_ms: 5_000,
            handshake_timeout_ms: 5_000,
        }
    }
}

impl MessengerConfig {
    /// Create configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    ///
    /// # Environment Variables
    ///
    /// - `PB_TICK_INTERVAL_MS` (default: 500)
    /// - `PB_ACK_TIMEOUT_MS` (default: 2000)
    /// - `PB_KNOWN_ACK_TIMEOUT_MS` (default: 10000)
    /// - `PB_RESPONSE_TIMEOUT_MS` (default: -1)
    /// - `PB_CHILD_HANDSHAKE_TIMEOUT_MS` (default: 5000)
    /// - `PB_HANDSHAKE_TIMEOUT_MS` (default: 5000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            tick_interval_ms: env_or("PB_TICK_INTERVAL_MS", defaults.tick_interval_ms),
            ack_timeout_ms: env_or("PB_ACK_TIMEOUT_MS", defaults.ack_timeout_ms),
            known_ack_timeout_ms: env_or("PB_KNOWN_ACK_TIMEOUT_MS", defaults.known_ack_timeout_ms),
            response_timeout_ms: env_or("PB_RESPONSE_TIMEOUT_MS", defaults.response_timeout_ms),
            child_handshake_timeout_ms: env_or(
                "PB_CHILD_HANDSHAKE_TIMEOUT_MS",
                defaults.child_handshake_timeout_ms,
            ),
            handshake_timeout_ms: env_or("PB_HANDSHAKE_TIMEOUT_MS", defaults.handshake_timeout_ms),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidTick(
                "tick_interval_ms cannot be 0".into(),
            ));
        }

        if self.ack_timeout_ms == 0 || self.known_ack_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout(
                "ack timeouts cannot be 0".into(),
            ));
        }

        if self.known_ack_timeout_ms < self.ack_timeout_ms {
            return Err(ConfigError::InvalidTimeout(
                "known_ack_timeout_ms cannot be shorter than ack_timeout_ms".into(),
            ));
        }

        if ResponseTimeout::from_millis(self.response_timeout_ms).is_none() {
            return Err(ConfigError::InvalidTimeout(format!(
                "response_timeout_ms must be -1 or positive, got {}",
                self.response_timeout_ms
            )));
        }

        if self.child_handshake_timeout_ms == 0 || self.handshake_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout(
                "handshake timeouts cannot be 0".into(),
            ));
        }

        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Ack budget, longer for endpoints that have proven responsive.
    pub fn ack_timeout(&self, known_endpoint: bool) -> Duration {
        if known_endpoint {
            Duration::from_millis(self.known_ack_timeout_ms)
        } else {
            Duration::from_millis(self.ack_timeout_ms)
        }
    }

    pub fn response_timeout(&self) -> ResponseTimeout {
        ResponseTimeout::from_millis(self.response_timeout_ms).unwrap_or(ResponseTimeout::Unbounded)
    }

    pub fn child_handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.child_handshake_timeout_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    /// Builder-style method to set the tick interval
    pub fn with_tick_interval_ms(mut self, ms: u64) -> Self {
        self.tick_interval_ms = ms;
        self
    }

    /// Builder-style method to set both ack budgets
    pub fn with_ack_timeouts_ms(mut self, unknown: u64, known: u64) -> Self {
        self.ack_timeout_ms = unknown;
        self.known_ack_timeout_ms = known;
        self
    }

    /// Builder-style method to set the default response budget
    pub fn with_response_timeout_ms(mut self, ms: i64) -> Self {
        self.response_timeout_ms = ms;
        self
    }

    /// Builder-style method to set both handshake budgets
    pub fn with_handshake_timeouts_ms(mut self, child: u64, pattern: u64) -> Self {
        self.child_handshake_timeout_ms = child;
        self.handshake_timeout_ms = pattern;
        self
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MessengerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tick_interval(), Duration::from_millis(500));
        assert_eq!(config.ack_timeout(false), Duration::from_millis(2_000));
        assert_eq!(config.ack_timeout(true), Duration::from_millis(10_000));
        assert!(config.response_timeout().is_unbounded());
    }

    #[test]
    fn test_response_timeout_from_millis() {
        assert_eq!(
            ResponseTimeout::from_millis(-1),
            Some(ResponseTimeout::Unbounded)
        );
        assert_eq!(
            ResponseTimeout::from_millis(1500),
            Some(ResponseTimeout::Bounded(Duration::from_millis(1500)))
        );
        assert_eq!(ResponseTimeout::from_millis(0), None);
        assert_eq!(ResponseTimeout::from_millis(-7), None);
    }

    #[test]
    fn test_validation_failures() {
        let config = MessengerConfig::default().with_tick_interval_ms(0);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTick(_))));

        let config = MessengerConfig::default().with_ack_timeouts_ms(5_000, 1_000);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTimeout(_))
        ));

        let config = MessengerConfig::default().with_response_timeout_ms(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTimeout(_))
        ));

        let config = MessengerConfig::default().with_handshake_timeouts_ms(0, 10);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_deserialization_uses_defaults() {
        let config: MessengerConfig =
            serde_json::from_str(r#"{"ack_timeout_ms": 3000, "response_timeout_ms": 8000}"#)
                .unwrap();
        assert_eq!(config.ack_timeout_ms, 3_000);
        assert_eq!(config.tick_interval_ms, 500);
        assert_eq!(
            config.response_timeout(),
            ResponseTimeout::Bounded(Duration::from_millis(8_000))
        );
    }
}
