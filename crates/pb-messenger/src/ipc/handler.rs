//! Inbound listener.
//!
//! Pumps acknowledgements and responses from an `InboundSource` into the
//! messenger until the source closes.

use crate::error::TransportError;
use crate::ports::inbound::MessengerApi;
use crate::ports::outbound::InboundSource;
use crate::service::messenger::Delivery;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Routes inbound messages to pending requests.
pub struct ResponseListener {
    messenger: Arc<dyn MessengerApi>,
    source: Arc<dyn InboundSource>,
}

impl ResponseListener {
    pub fn new(messenger: Arc<dyn MessengerApi>, source: Arc<dyn InboundSource>) -> Self {
        Self { messenger, source }
    }

    /// Run the listener loop. Returns the number of messages routed.
    pub async fn run(self) -> u64 {
        let mut routed = 0;
        loop {
            match self.source.receive().await {
                Ok(inbound) => {
                    let key = inbound.envelope.hash().clone();
                    match self.messenger.receive(inbound) {
                        Ok(Delivery::Ignored) => {}
                        Ok(delivery) => {
                            routed += 1;
                            debug!(correlation_key = %key, ?delivery, "Routed inbound message");
                        }
                        Err(e) => {
                            warn!(correlation_key = %key, error = %e, "Dropped inbound message");
                        }
                    }
                }
                Err(TransportError::Closed) => {
                    warn!("Inbound source closed, stopping listener");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "Error receiving inbound message");
                }
            }
        }
        routed
    }
}
