//! Correlation keys for request tracking.
//!
//! A key is the logical request name joined to a fresh unique token, so two
//! concurrent requests with the same name never collide.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between the logical name and the token.
const SEPARATOR: char = '_';

/// Correlation key pairing a request with its acknowledgement and response.
///
/// Rendered as `<name>_<token>`; the name part keeps the key readable in logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationKey(String);

impl CorrelationKey {
    /// Build a key from a logical name and a fresh token.
    pub fn new(name: &str, token: &str) -> Self {
        Self(format!("{name}{SEPARATOR}{token}"))
    }

    /// Wrap a key received over the wire.
    pub fn from_wire(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Token part of the key (everything after the last separator).
    pub fn token(&self) -> &str {
        self.0
            .rsplit_once(SEPARATOR)
            .map(|(_, token)| token)
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CorrelationKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let key = CorrelationKey::new("ping", "abc123");
        assert_eq!(key.as_str(), "ping_abc123");
        assert_eq!(key.token(), "abc123");
    }

    #[test]
    fn test_token_with_underscored_name() {
        let key = CorrelationKey::new("get_user", "t1");
        assert_eq!(key.token(), "t1");
    }

    #[test]
    fn test_key_serialization_is_transparent() {
        let key = CorrelationKey::new("ping", "abc");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"ping_abc\"");
        let parsed: CorrelationKey = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, key);
    }
}
