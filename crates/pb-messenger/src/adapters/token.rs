//! UUID-backed token source.

use crate::ports::outbound::TokenSource;
use uuid::Uuid;

/// Produces collision-resistant tokens for correlation keys.
///
/// Time-ordered (v7) tokens by default so keys sort by creation in logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidTokenSource {
    random: bool,
}

impl UuidTokenSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fully random (v4) tokens.
    pub fn random() -> Self {
        Self { random: true }
    }
}

impl TokenSource for UuidTokenSource {
    fn fresh_token(&self) -> String {
        let id = if self.random {
            Uuid::new_v4()
        } else {
            Uuid::now_v7()
        };
        id.simple().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tokens_are_unique() {
        for source in [UuidTokenSource::new(), UuidTokenSource::random()] {
            let tokens: HashSet<_> = (0..1000).map(|_| source.fresh_token()).collect();
            assert_eq!(tokens.len(), 1000);
        }
    }

    #[test]
    fn test_token_has_no_separator() {
        let token = UuidTokenSource::new().fresh_token();
        assert_eq!(token.len(), 32);
        assert!(!token.contains('_'));
        assert!(!token.contains('-'));
    }
}
