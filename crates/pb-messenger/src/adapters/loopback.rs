//! In-process loopback network.
//!
//! Simulates isolated contexts exchanging serialized messages through a
//! fire-and-forget primitive. Each joined context gets an inbox; messages
//! addressed to the wrong origin are dropped without an error, like the
//! real primitive does.

use crate::domain::endpoint::EndpointId;
use crate::domain::origin::WILDCARD;
use crate::error::{GreetError, TransportError};
use crate::ipc::envelope::{Envelope, Inbound};
use crate::ports::outbound::{EndpointProbe, Greeter, Hello, InboundSource, Transport};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace};

struct Node {
    origin: String,
    parent: Option<EndpointId>,
    reachable: bool,
    listening: bool,
    inbox: mpsc::UnboundedSender<Inbound>,
}

/// Shared medium all loopback contexts send through.
#[derive(Default)]
pub struct LoopbackNetwork {
    nodes: Mutex<HashMap<EndpointId, Node>>,
}

impl LoopbackNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Add a context to the network. `parent` is the context containing it.
    ///
    /// Rejoining with an existing id replaces the old node and closes its inbox.
    pub fn join(
        self: &Arc<Self>,
        id: impl Into<EndpointId>,
        origin: impl Into<String>,
        parent: Option<EndpointId>,
    ) -> LoopbackContext {
        let id = id.into();
        let origin = origin.into();
        let (inbox, receiver) = mpsc::unbounded_channel();

        self.nodes.lock().insert(
            id.clone(),
            Node {
                origin: origin.clone(),
                parent,
                reachable: true,
                listening: true,
                inbox,
            },
        );
        debug!(endpoint = %id, origin = %origin, "Joined loopback network");

        LoopbackContext {
            network: Arc::clone(self),
            id,
            origin,
            receiver: tokio::sync::Mutex::new(receiver),
        }
    }

    pub fn set_reachable(&self, id: &EndpointId, reachable: bool) -> bool {
        self.update(id, |node| node.reachable = reachable)
    }

    /// A context that is not listening never answers greetings.
    pub fn set_listening(&self, id: &EndpointId, listening: bool) -> bool {
        self.update(id, |node| node.listening = listening)
    }

    /// Remove a context entirely; its inbox closes.
    pub fn teardown(&self, id: &EndpointId) -> bool {
        let removed = self.nodes.lock().remove(id).is_some();
        if removed {
            debug!(endpoint = %id, "Tore down loopback context");
        }
        removed
    }

    fn update(&self, id: &EndpointId, f: impl FnOnce(&mut Node)) -> bool {
        match self.nodes.lock().get_mut(id) {
            Some(node) => {
                f(node);
                true
            }
            None => false,
        }
    }
}

/// One context's view of the loopback network.
pub struct LoopbackContext {
    network: Arc<LoopbackNetwork>,
    id: EndpointId,
    origin: String,
    receiver: tokio::sync::Mutex<mpsc::UnboundedReceiver<Inbound>>,
}

impl LoopbackContext {
    pub fn id(&self) -> &EndpointId {
        &self.id
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Answer an inbound message back to whoever sent it.
    pub fn reply(&self, to: &Inbound, envelope: &Envelope) -> Result<(), TransportError> {
        self.transmit(&to.source, &to.origin, envelope)
    }
}

impl EndpointProbe for LoopbackContext {
    fn is_reachable(&self, endpoint: &EndpointId) -> bool {
        self.network
            .nodes
            .lock()
            .get(endpoint)
            .is_some_and(|node| node.reachable)
    }

    fn is_ancestor_of(&self, endpoint: &EndpointId) -> bool {
        self.network
            .nodes
            .lock()
            .get(endpoint)
            .and_then(|node| node.parent.as_ref())
            .is_some_and(|parent| parent == &self.id)
    }

    fn own_origin(&self) -> String {
        self.origin.clone()
    }
}

impl Transport for LoopbackContext {
    fn transmit(
        &self,
        target: &EndpointId,
        origin: &str,
        envelope: &Envelope,
    ) -> Result<(), TransportError> {
        let wire =
            serde_json::to_string(envelope).map_err(|e| TransportError::Encode(e.to_string()))?;

        let nodes = self.network.nodes.lock();
        let node = nodes
            .get(target)
            .ok_or_else(|| TransportError::UnknownEndpoint(target.clone()))?;
        if !node.reachable {
            return Err(TransportError::Unreachable(target.clone()));
        }

        if origin != WILDCARD && origin != node.origin {
            debug!(
                endpoint = %target,
                requested = %origin,
                actual = %node.origin,
                "Dropping message addressed to another origin"
            );
            return Ok(());
        }

        let envelope: Envelope =
            serde_json::from_str(&wire).map_err(|e| TransportError::Encode(e.to_string()))?;
        trace!(from = %self.id, to = %target, bytes = wire.len(), kind = envelope.kind(), "Delivering");

        // Fire and forget: a closed inbox just loses the message
        let _ = node.inbox.send(Inbound {
            source: self.id.clone(),
            origin: self.origin.clone(),
            envelope,
        });
        Ok(())
    }
}

#[async_trait]
impl Greeter for LoopbackContext {
    async fn greet(&self, target: &EndpointId) -> Result<Hello, GreetError> {
        let answer = {
            let nodes = self.network.nodes.lock();
            match nodes.get(target) {
                Some(node) if node.reachable && node.listening => Some(node.origin.clone()),
                Some(node) if node.reachable => None,
                _ => return Err(GreetError::Unreachable(target.clone())),
            }
        };

        match answer {
            Some(origin) => Ok(Hello { origin }),
            // Never answers; the caller's timeout decides
            None => std::future::pending().await,
        }
    }
}

#[async_trait]
impl InboundSource for LoopbackContext {
    async fn receive(&self) -> Result<Inbound, TransportError> {
        self.receiver
            .lock()
            .await
            .recv()
            .await
            .ok_or(TransportError::Closed)
    }
}
