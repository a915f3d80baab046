//! Request Orchestrator.
//!
//! Turns the fire-and-forget `Transport` into correlated, timeout-bounded,
//! cancellable request/response exchanges:
//!
//! ```text
//! VALIDATING ─► (HANDSHAKING) ─► AWAITING_ACK ─► AWAITING_RESPONSE ─► SETTLED
//!      │               │               │                  │
//!      └── fire-and-forget: settle as soon as transmission succeeds
//! ```
//!
//! Validation is synchronous and happens before any await point, so a bad
//! name, a malformed option or a dead target never causes I/O.

use crate::adapters::history::InMemoryExchangeHistory;
use crate::adapters::token::UuidTokenSource;
use crate::domain::clock::TimeoutClock;
use crate::domain::config::{MessengerConfig, ResponseTimeout};
use crate::domain::correlation::CorrelationKey;
use crate::domain::endpoint::EndpointId;
use crate::domain::options::SendOptions;
use crate::domain::origin::{OriginPattern, WILDCARD};
use crate::domain::pending::{PendingEntry, ResponseRegistry, Settlement};
use crate::error::{ConfigError, Phase, ReceiveError, SendError};
use crate::ipc::envelope::{Envelope, Inbound, ResponseStatus};
use crate::ports::outbound::{
    EndpointProbe, ExchangeHistory, Greeter, Hello, TokenSource, Transport,
};
use crate::service::handshake::HandshakeResolver;
use crate::service::supervisor::{self, Supervision};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Reserved logical name for method calls; logs show the called method instead.
pub const METHOD_MESSAGE_NAME: &str = "method";

/// What `receive` did with an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The request is now acknowledged.
    Acknowledged,
    /// The request settled with this response.
    Settled,
    /// No pending request for the key (late arrival after settlement).
    Ignored,
}

/// Cancels an in-flight request from anywhere.
#[derive(Clone)]
pub struct CancelHandle {
    key: CorrelationKey,
    registry: Arc<ResponseRegistry>,
}

impl CancelHandle {
    /// Request cancellation; observed on the next tick. Returns false if the
    /// request already settled.
    pub fn cancel(&self) -> bool {
        self.registry.mark_cancelled(&self.key)
    }

    pub fn key(&self) -> &CorrelationKey {
        &self.key
    }
}

/// Outcome of a dispatched request, awaited with [`PendingResponse::wait`].
///
/// Dropping it without waiting cancels the request on the next tick.
pub struct PendingResponse {
    key: CorrelationKey,
    receiver: Option<oneshot::Receiver<Settlement>>,
    registry: Arc<ResponseRegistry>,
}

impl PendingResponse {
    pub fn key(&self) -> &CorrelationKey {
        &self.key
    }

    /// Whether a response is being tracked (false for fire-and-forget).
    pub fn is_tracked(&self) -> bool {
        self.receiver.is_some()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            key: self.key.clone(),
            registry: Arc::clone(&self.registry),
        }
    }

    pub fn cancel(&self) -> bool {
        self.registry.mark_cancelled(&self.key)
    }

    /// Wait for settlement. Fire-and-forget requests resolve to `null`.
    pub async fn wait(self) -> Result<Value, SendError> {
        let Some(receiver) = self.receiver else {
            return Ok(Value::Null);
        };
        receiver.await.unwrap_or_else(|_| {
            Err(SendError::Internal(format!(
                "pending request {} dropped without settlement",
                self.key
            )))
        })
    }
}

/// The messenger: public entry point for correlated requests.
pub struct Messenger {
    config: MessengerConfig,
    registry: Arc<ResponseRegistry>,
    probe: Arc<dyn EndpointProbe>,
    transport: Arc<dyn Transport>,
    handshake: HandshakeResolver,
    tokens: Arc<dyn TokenSource>,
    history: Arc<dyn ExchangeHistory>,
}

impl Messenger {
    /// Create a messenger with UUID tokens and in-memory exchange history.
    pub fn new(
        config: MessengerConfig,
        probe: Arc<dyn EndpointProbe>,
        transport: Arc<dyn Transport>,
        greeter: Arc<dyn Greeter>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            registry: Arc::new(ResponseRegistry::new()),
            probe,
            transport,
            handshake: HandshakeResolver::new(greeter),
            tokens: Arc::new(UuidTokenSource::new()),
            history: Arc::new(InMemoryExchangeHistory::new()),
        })
    }

    pub fn with_token_source(mut self, tokens: Arc<dyn TokenSource>) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn with_exchange_history(mut self, history: Arc<dyn ExchangeHistory>) -> Self {
        self.history = history;
        self
    }

    pub fn config(&self) -> &MessengerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ResponseRegistry> {
        &self.registry
    }

    pub fn handshake(&self) -> &HandshakeResolver {
        &self.handshake
    }

    /// Send a request and wait for its response.
    pub async fn send(
        &self,
        target: &EndpointId,
        name: &str,
        payload: Value,
        options: SendOptions,
    ) -> Result<Value, SendError> {
        self.dispatch(target, name, payload, options)
            .await?
            .wait()
            .await
    }

    /// Validate, resolve the origin, register and transmit a request.
    ///
    /// Returns once the request is on its way; the response is awaited
    /// through the returned [`PendingResponse`].
    pub async fn dispatch(
        &self,
        target: &EndpointId,
        name: &str,
        payload: Value,
        options: SendOptions,
    ) -> Result<PendingResponse, SendError> {
        self.validate(target, name, &options)?;

        let log_name = display_name(name, &payload);
        let target_origin = self.resolve_origin(target, &log_name, &options).await?;

        let key = CorrelationKey::new(name, &self.tokens.fresh_token());
        let envelope = Envelope::Request {
            hash: key.clone(),
            name: name.to_string(),
            data: payload,
            fire_and_forget: options.fire_and_forget,
        };

        if options.fire_and_forget {
            self.transmit(target, &target_origin, &envelope, &log_name)?;
            debug!(
                correlation_key = %key,
                name = %log_name,
                origin = %target_origin,
                "Sent fire-and-forget request"
            );
            return Ok(PendingResponse {
                key,
                receiver: None,
                registry: Arc::clone(&self.registry),
            });
        }

        let (entry, receiver) = PendingEntry::new(&log_name, target.clone(), &target_origin);
        self.registry.register(key.clone(), entry)?;
        self.registry.track(target, &key);

        if let Err(err) = self.transmit(target, &target_origin, &envelope, &log_name) {
            return Err(self.fail_registered(&key, receiver, err));
        }

        let known = self.history.has_prior_successful_exchange(target);
        let response_budget = options.timeout.unwrap_or_else(|| self.config.response_timeout());
        let clock = TimeoutClock::new(
            self.config.tick_interval(),
            self.config.ack_timeout(known),
            response_budget,
        );

        let handle = supervisor::spawn(
            Arc::clone(&self.registry),
            Arc::clone(&self.probe),
            Supervision {
                key: key.clone(),
                log_name: log_name.clone(),
                target: target.clone(),
                target_origin: target_origin.clone(),
                own_origin: self.probe.own_origin(),
                tick: self.config.tick_interval(),
                clock,
            },
        );
        if let Err(handle) = self.registry.attach_tick(&key, handle) {
            // Settled while we were spawning
            handle.cancel();
        }

        debug!(
            correlation_key = %key,
            name = %log_name,
            origin = %target_origin,
            known_endpoint = known,
            unbounded = matches!(response_budget, ResponseTimeout::Unbounded),
            "Sent request"
        );

        Ok(PendingResponse {
            key,
            receiver: Some(receiver),
            registry: Arc::clone(&self.registry),
        })
    }

    /// Request cancellation of an in-flight request.
    pub fn cancel(&self, key: &CorrelationKey) -> bool {
        self.registry.mark_cancelled(key)
    }

    /// Route an inbound acknowledgement or response to its pending request.
    ///
    /// # Errors
    ///
    /// - `ReceiveError::UnexpectedKind` - a request, which is not ours to answer
    /// - `ReceiveError::SourceMismatch` - sent by a different endpoint than the target
    /// - `ReceiveError::OriginRejected` - sender origin does not match the request's
    pub fn receive(&self, inbound: Inbound) -> Result<Delivery, ReceiveError> {
        let Inbound {
            source,
            origin,
            envelope,
        } = inbound;

        if matches!(envelope, Envelope::Request { .. }) {
            return Err(ReceiveError::UnexpectedKind {
                kind: envelope.kind(),
            });
        }

        let key = envelope.hash().clone();
        let Some(info) = self.registry.info(&key) else {
            debug!(
                correlation_key = %key,
                kind = envelope.kind(),
                errored = self.registry.is_errored(&key),
                "Ignoring message for settled or unknown request"
            );
            return Ok(Delivery::Ignored);
        };

        if info.target != source {
            warn!(
                correlation_key = %key,
                expected = %info.target,
                actual = %source,
                "Rejected message from unexpected endpoint"
            );
            return Err(ReceiveError::SourceMismatch {
                key,
                expected: info.target,
                actual: source,
            });
        }

        if !OriginPattern::exact(info.expected_origin.as_str()).matches(&origin) {
            warn!(
                correlation_key = %key,
                expected = %info.expected_origin,
                actual = %origin,
                "Rejected message from unexpected origin"
            );
            return Err(ReceiveError::OriginRejected {
                key,
                expected: info.expected_origin,
                actual: origin,
            });
        }

        // A response without a prior ack counts as one.
        self.registry.mark_acknowledged(&key);

        let outcome = match envelope {
            Envelope::Ack { .. } => {
                debug!(correlation_key = %key, "Request acknowledged");
                return Ok(Delivery::Acknowledged);
            }
            Envelope::Response {
                ack: ResponseStatus::Success,
                data,
                ..
            } => {
                self.history.record_successful_exchange(&info.target);
                Ok(data)
            }
            Envelope::Response { error, .. } => Err(SendError::Remote {
                name: info.name,
                own_origin: self.probe.own_origin(),
                message: error.unwrap_or_else(|| "unknown remote error".to_string()),
            }),
            Envelope::Request { .. } => {
                return Err(ReceiveError::UnexpectedKind { kind: "request" });
            }
        };

        if self.registry.settle(&key, outcome) {
            Ok(Delivery::Settled)
        } else {
            Ok(Delivery::Ignored)
        }
    }

    /// Reject every request in flight to `endpoint` after it was torn down.
    ///
    /// Returns how many requests were settled.
    pub fn reject_endpoint(&self, endpoint: &EndpointId) -> usize {
        self.handshake.forget(endpoint);
        self.history.forget(endpoint);

        let mut rejected = 0;
        for key in self.registry.tracked(endpoint) {
            let Some(info) = self.registry.info(&key) else {
                continue;
            };
            let settled = self.registry.settle(
                &key,
                Err(SendError::TargetUnreachable {
                    name: info.name,
                    own_origin: self.probe.own_origin(),
                    endpoint: endpoint.clone(),
                    target_origin: info.expected_origin,
                    phase: Phase::from_ack(info.acknowledged),
                }),
            );
            if settled {
                rejected += 1;
            }
        }

        if rejected > 0 {
            info!(endpoint = %endpoint, rejected, "Rejected in-flight requests for torn down endpoint");
        }
        rejected
    }

    fn validate(
        &self,
        target: &EndpointId,
        name: &str,
        options: &SendOptions,
    ) -> Result<(), SendError> {
        if name.is_empty() {
            return Err(SendError::invalid("Expected name"));
        }

        options.validate()?;

        if !self.probe.is_reachable(target) {
            return Err(SendError::TargetUnreachable {
                name: name.to_string(),
                own_origin: self.probe.own_origin(),
                endpoint: target.clone(),
                target_origin: options.origin.to_string(),
                phase: Phase::BeforeSend,
            });
        }

        Ok(())
    }

    /// Decide the concrete origin to transmit to.
    ///
    /// Contained endpoints are always greeted; otherwise only set/regex
    /// patterns need discovery. An exact origin is used as given; a wildcard
    /// adopts the greeted origin when a greeting ran.
    async fn resolve_origin(
        &self,
        target: &EndpointId,
        log_name: &str,
        options: &SendOptions,
    ) -> Result<String, SendError> {
        let discovered: Option<Hello> = if self.probe.is_ancestor_of(target) {
            let budget = match options.timeout {
                Some(ResponseTimeout::Bounded(budget)) => budget,
                _ => self.config.child_handshake_timeout(),
            };
            Some(self.handshake.discover_origin(target, budget).await?)
        } else if options.origin.is_ambiguous() {
            Some(
                self.handshake
                    .discover_origin(target, self.config.handshake_timeout())
                    .await?,
            )
        } else {
            None
        };

        if discovered.is_some() {
            self.history.record_successful_exchange(target);
        }

        match (&options.origin, discovered) {
            (OriginPattern::Exact(origin), _) => Ok(origin.clone()),
            (OriginPattern::Wildcard, Some(hello)) => Ok(hello.origin),
            (OriginPattern::Wildcard, None) => Ok(WILDCARD.to_string()),
            (pattern, Some(hello)) => {
                if pattern.matches(&hello.origin) {
                    Ok(hello.origin)
                } else {
                    warn!(
                        endpoint = %target,
                        expected = %pattern,
                        actual = %hello.origin,
                        "Origin mismatch"
                    );
                    Err(SendError::OriginMismatch {
                        name: log_name.to_string(),
                        own_origin: self.probe.own_origin(),
                        endpoint: target.clone(),
                        expected: pattern.to_string(),
                        actual: hello.origin,
                    })
                }
            }
            (pattern, None) => Err(SendError::Internal(format!(
                "origin pattern {pattern} was not resolved"
            ))),
        }
    }

    fn transmit(
        &self,
        target: &EndpointId,
        origin: &str,
        envelope: &Envelope,
        log_name: &str,
    ) -> Result<(), SendError> {
        self.transport
            .transmit(target, origin, envelope)
            .map_err(|source| {
                warn!(endpoint = %target, name = %log_name, error = %source, "Transmission failed");
                SendError::TransmissionFailure {
                    name: log_name.to_string(),
                    own_origin: self.probe.own_origin(),
                    source,
                }
            })
    }

    /// Settle a registered request that failed before its loop started and
    /// hand the error back to the caller.
    fn fail_registered(
        &self,
        key: &CorrelationKey,
        mut receiver: oneshot::Receiver<Settlement>,
        err: SendError,
    ) -> SendError {
        self.registry.settle(key, Err(err));
        match receiver.try_recv() {
            Ok(Err(err)) => err,
            Ok(Ok(_)) | Err(_) => {
                SendError::Internal(format!("request {key} settled before transmission"))
            }
        }
    }
}

/// Name shown in logs and errors: `method()` for method calls.
pub fn display_name(name: &str, payload: &Value) -> String {
    if name == METHOD_MESSAGE_NAME {
        if let Some(method) = payload.get("name").and_then(Value::as_str) {
            return format!("{method}()");
        }
    }
    name.to_string()
}
