//! In-memory exchange history.

use crate::domain::endpoint::EndpointId;
use crate::ports::outbound::ExchangeHistory;
use parking_lot::RwLock;
use std::collections::HashSet;

/// Remembers endpoints that completed an exchange with this process.
#[derive(Debug, Default)]
pub struct InMemoryExchangeHistory {
    known: RwLock<HashSet<EndpointId>>,
}

impl InMemoryExchangeHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.known.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.read().is_empty()
    }
}

impl ExchangeHistory for InMemoryExchangeHistory {
    fn has_prior_successful_exchange(&self, endpoint: &EndpointId) -> bool {
        self.known.read().contains(endpoint)
    }

    fn record_successful_exchange(&self, endpoint: &EndpointId) {
        self.known.write().insert(endpoint.clone());
    }

    fn forget(&self, endpoint: &EndpointId) {
        self.known.write().remove(endpoint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_forget() {
        let history = InMemoryExchangeHistory::new();
        let endpoint = EndpointId::new("child");
        assert!(!history.has_prior_successful_exchange(&endpoint));

        history.record_successful_exchange(&endpoint);
        history.record_successful_exchange(&endpoint);
        assert!(history.has_prior_successful_exchange(&endpoint));
        assert_eq!(history.len(), 1);

        history.forget(&endpoint);
        assert!(history.is_empty());
    }
}
