//! Outbound Ports (Driven Ports)
//!
//! These traits define what the messenger needs from the surrounding
//! system: endpoint identity and reachability, the raw send primitive, the
//! greeting primitive, token generation and exchange history.

use async_trait::async_trait;

use crate::domain::endpoint::EndpointId;
use crate::error::{GreetError, TransportError};
use crate::ipc::envelope::{Envelope, Inbound};

/// Endpoint identity and reachability primitives.
pub trait EndpointProbe: Send + Sync {
    /// Whether `endpoint` still exists and can receive messages.
    fn is_reachable(&self, endpoint: &EndpointId) -> bool;

    /// Whether this context contains `endpoint` (it is "below" us), so its
    /// origin can only be learned from its greeting.
    fn is_ancestor_of(&self, endpoint: &EndpointId) -> bool;

    /// Origin of this context, used to enrich errors.
    fn own_origin(&self) -> String;
}

/// Fire-and-forget send primitive.
///
/// Delivery is not guaranteed. Implementations return an error only when
/// the send is clearly impossible.
pub trait Transport: Send + Sync {
    fn transmit(
        &self,
        target: &EndpointId,
        origin: &str,
        envelope: &Envelope,
    ) -> Result<(), TransportError>;
}

/// Greeting self-reported by an endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hello {
    pub origin: String,
}

/// Handshake primitive: ask an endpoint for its actual origin.
///
/// May never resolve if the endpoint is not listening; callers bound it
/// with a timeout.
#[async_trait]
pub trait Greeter: Send + Sync {
    async fn greet(&self, target: &EndpointId) -> Result<Hello, GreetError>;
}

/// Source of process-wide unique tokens for correlation keys.
pub trait TokenSource: Send + Sync {
    fn fresh_token(&self) -> String;
}

/// Memory of endpoints that have completed an exchange with this process.
pub trait ExchangeHistory: Send + Sync {
    fn has_prior_successful_exchange(&self, endpoint: &EndpointId) -> bool;

    fn record_successful_exchange(&self, endpoint: &EndpointId);

    fn forget(&self, endpoint: &EndpointId);
}

/// Stream of inbound messages delivered by the transport.
#[async_trait]
pub trait InboundSource: Send + Sync {
    /// Receive the next inbound message; `TransportError::Closed` ends the stream.
    async fn receive(&self) -> Result<Inbound, TransportError>;
}
