//! Loopback world used by the integration flows.
//!
//! A parent context owns a `Messenger` and a `ResponseListener`; a child
//! context runs a scripted responder that answers requests the way a remote
//! handler would.

use pb_messenger::{
    Envelope, EndpointId, Inbound, InboundSource, LoopbackContext, LoopbackNetwork, Messenger, MessengerConfig,
    ResponseListener,
};
use pb_telemetry::{init_logging, TelemetryConfig};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

pub const PARENT_ORIGIN: &str = "https://parent.example";
pub const CHILD_ORIGIN: &str = "https://child.example";

/// How the child answers requests.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Ack, then respond with `{name, echo: data}`
    Echo,
    /// Ack, then respond after a delay
    Slow(Duration),
    /// Ack, then respond with an error message
    Fail(String),
    /// Ack and never respond
    AckOnly,
    /// Never answer at all
    Silent,
}

/// Where the child sits relative to the parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Contained by the parent; its origin is learned by greeting it
    Contained,
    /// Not contained (e.g. a sibling or opener)
    Detached,
}

pub struct World {
    pub network: Arc<LoopbackNetwork>,
    pub parent: Arc<LoopbackContext>,
    pub child: Arc<LoopbackContext>,
    pub messenger: Arc<Messenger>,
    /// Requests the child has seen, fire-and-forget included
    pub seen: Arc<AtomicUsize>,
    listener: JoinHandle<u64>,
    responder: JoinHandle<()>,
}

impl World {
    pub fn new(behavior: Behavior, placement: Placement) -> Self {
        Self::with_config(behavior, placement, MessengerConfig::default())
    }

    pub fn with_config(behavior: Behavior, placement: Placement, config: MessengerConfig) -> Self {
        let _ = init_logging(&TelemetryConfig::for_tests());

        let network = LoopbackNetwork::new();
        let parent = Arc::new(network.join("parent", PARENT_ORIGIN, None));
        let child_parent = match placement {
            Placement::Contained => Some(parent.id().clone()),
            Placement::Detached => None,
        };
        let child = Arc::new(network.join("child", CHILD_ORIGIN, child_parent));

        let messenger = Arc::new(
            Messenger::new(config, parent.clone(), parent.clone(), parent.clone())
                .expect("default config is valid"),
        );

        let listener = tokio::spawn(
            ResponseListener::new(messenger.clone(), parent.clone()).run(),
        );
        let seen = Arc::new(AtomicUsize::new(0));
        let responder = spawn_responder(child.clone(), behavior, seen.clone());

        Self {
            network,
            parent,
            child,
            messenger,
            seen,
            listener,
            responder,
        }
    }

    pub fn child_id(&self) -> EndpointId {
        self.child.id().clone()
    }

    /// Remove the child from the network and reject what is in flight to it.
    pub fn teardown_child(&self) -> usize {
        self.network.teardown(self.child.id());
        self.messenger.reject_endpoint(self.child.id())
    }
}

impl Drop for World {
    fn drop(&mut self) {
        self.listener.abort();
        self.responder.abort();
    }
}

fn spawn_responder(
    child: Arc<LoopbackContext>,
    behavior: Behavior,
    seen: Arc<AtomicUsize>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Ok(inbound) = child.receive().await {
            let Envelope::Request {
                hash,
                name,
                data,
                fire_and_forget,
            } = &inbound.envelope
            else {
                continue;
            };
            seen.fetch_add(1, Ordering::SeqCst);
            debug!(correlation_key = %hash, name = %name, "Child received request");

            if *fire_and_forget || matches!(behavior, Behavior::Silent) {
                continue;
            }

            reply(&child, &inbound, Envelope::ack_for(hash, name));

            let response = match &behavior {
                Behavior::Echo => Envelope::success_for(hash, name, echo(name, data)),
                Behavior::Slow(delay) => {
                    let child = child.clone();
                    let inbound = inbound.clone();
                    let envelope = Envelope::success_for(hash, name, echo(name, data));
                    let delay = *delay;
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        reply(&child, &inbound, envelope);
                    });
                    continue;
                }
                Behavior::Fail(message) => Envelope::error_for(hash, name, message.clone()),
                Behavior::AckOnly | Behavior::Silent => continue,
            };
            reply(&child, &inbound, response);
        }
    })
}

fn reply(child: &LoopbackContext, to: &Inbound, envelope: Envelope) {
    if let Err(e) = child.reply(to, &envelope) {
        debug!(error = %e, "Child reply dropped");
    }
}

/// Payload the echo responder sends back.
pub fn echo(name: &str, data: &Value) -> Value {
    json!({ "name": name, "echo": data })
}
