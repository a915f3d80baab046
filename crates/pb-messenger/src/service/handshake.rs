//! Handshake Resolver.
//!
//! Learns a target's actual origin with a one-shot greeting, bounded by a
//! timeout. Discovered origins are cached per endpoint so later requests
//! skip the extra round trip.

use crate::domain::endpoint::EndpointId;
use crate::error::SendError;
use crate::ports::outbound::{Greeter, Hello};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Resolves endpoint origins through the greeting primitive.
pub struct HandshakeResolver {
    greeter: Arc<dyn Greeter>,
    known: RwLock<HashMap<EndpointId, String>>,
}

impl HandshakeResolver {
    pub fn new(greeter: Arc<dyn Greeter>) -> Self {
        Self {
            greeter,
            known: RwLock::new(HashMap::new()),
        }
    }

    /// Discover `target`'s origin, greeting it unless it is already known.
    ///
    /// # Errors
    ///
    /// - `SendError::HandshakeTimeout` - no greeting within `budget`
    /// - `SendError::HandshakeFailed` - the greeter refused outright
    pub async fn discover_origin(
        &self,
        target: &EndpointId,
        budget: Duration,
    ) -> Result<Hello, SendError> {
        if let Some(origin) = self.known_origin(target) {
            debug!(endpoint = %target, origin = %origin, "Using known endpoint origin");
            return Ok(Hello { origin });
        }

        let budget_ms = u64::try_from(budget.as_millis()).unwrap_or(u64::MAX);
        debug!(endpoint = %target, budget_ms, "Greeting endpoint");

        let hello = match tokio::time::timeout(budget, self.greeter.greet(target)).await {
            Ok(Ok(hello)) => hello,
            Ok(Err(source)) => {
                warn!(endpoint = %target, error = %source, "Greeting failed");
                return Err(SendError::HandshakeFailed {
                    endpoint: target.clone(),
                    source,
                });
            }
            Err(_) => {
                warn!(endpoint = %target, "Greeting timed out");
                return Err(SendError::HandshakeTimeout {
                    endpoint: target.clone(),
                    timeout_ms: budget_ms,
                });
            }
        };

        self.known
            .write()
            .insert(target.clone(), hello.origin.clone());
        Ok(hello)
    }

    /// Origin learned from an earlier greeting, if any.
    pub fn known_origin(&self, target: &EndpointId) -> Option<String> {
        self.known.read().get(target).cloned()
    }

    /// Drop what is known about `target`.
    pub fn forget(&self, target: &EndpointId) -> bool {
        self.known.write().remove(target).is_some()
    }
}
