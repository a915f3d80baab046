//! Per-call send options.

use crate::domain::config::ResponseTimeout;
use crate::domain::origin::OriginPattern;
use crate::error::SendError;
use serde_json::Value;

/// Options recognized by `send`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SendOptions {
    /// Acceptable target origin(s). Defaults to the wildcard.
    pub origin: OriginPattern,
    /// Response budget; `None` uses the configured default.
    pub timeout: Option<ResponseTimeout>,
    /// Transmit without tracking a response.
    pub fire_and_forget: bool,
}

impl SendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_origin(mut self, origin: impl Into<OriginPattern>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Response budget in milliseconds; `-1` is unbounded, `0` or other
    /// negatives are rejected when the request is validated.
    pub fn with_timeout_ms(mut self, ms: i64) -> Self {
        self.timeout = Some(
            ResponseTimeout::from_millis(ms)
                .unwrap_or(ResponseTimeout::Bounded(std::time::Duration::ZERO)),
        );
        self
    }

    pub fn fire_and_forget(mut self) -> Self {
        self.fire_and_forget = true;
        self
    }

    /// Parse untyped options `{origin, timeout, fireAndForget}`.
    ///
    /// Missing or `null` fields take their defaults. Unknown fields are
    /// ignored.
    pub fn from_json(value: &Value) -> Result<Self, SendError> {
        let map = match value {
            Value::Null => return Ok(Self::default()),
            Value::Object(map) => map,
            _ => return Err(SendError::invalid("Expected options to be an object")),
        };

        let origin = match map.get("origin") {
            None | Some(Value::Null) => OriginPattern::Wildcard,
            Some(raw) => OriginPattern::from_json(raw)?,
        };

        let timeout = match map.get("timeout") {
            None | Some(Value::Null) => None,
            Some(raw) => {
                let ms = raw
                    .as_i64()
                    .ok_or_else(|| SendError::invalid("Expected timeout to be an integer"))?;
                Some(ResponseTimeout::from_millis(ms).ok_or_else(|| {
                    SendError::invalid(format!("timeout must be -1 or positive, got {ms}"))
                })?)
            }
        };

        let fire_and_forget = match map.get("fireAndForget") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(flag)) => *flag,
            Some(_) => return Err(SendError::invalid("Expected fireAndForget to be a boolean")),
        };

        Ok(Self {
            origin,
            timeout,
            fire_and_forget,
        })
    }

    /// Check the options before any I/O.
    pub fn validate(&self) -> Result<(), SendError> {
        self.origin.validate()?;
        if let Some(ResponseTimeout::Bounded(budget)) = self.timeout {
            if budget.is_zero() {
                return Err(SendError::invalid("timeout must be -1 or positive"));
            }
        }
        Ok(())
    }
}
