//! Error types for the messenger.
//!
//! `SendError` is what a caller of `send` observes. The remaining enums are
//! raised by the driven ports and by inbound routing.

use crate::domain::correlation::CorrelationKey;
use crate::domain::endpoint::EndpointId;
use std::fmt;
use thiserror::Error;

/// Which phase a request was in when its target went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Target was gone before anything was transmitted.
    BeforeSend,
    /// Request transmitted, no acknowledgement observed yet.
    BeforeAck,
    /// Acknowledged, final response still outstanding.
    BeforeResponse,
}

impl Phase {
    /// Phase implied by an entry's acknowledgement flag.
    pub fn from_ack(acknowledged: bool) -> Self {
        if acknowledged {
            Phase::BeforeResponse
        } else {
            Phase::BeforeAck
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::BeforeSend => write!(f, "before send"),
            Phase::BeforeAck => write!(f, "before ack"),
            Phase::BeforeResponse => write!(f, "before response"),
        }
    }
}

/// Coarse category of a `SendError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SendErrorKind {
    InvalidArgument,
    TargetUnreachable,
    OriginMismatch,
    HandshakeTimeout,
    HandshakeFailed,
    TransmissionFailure,
    AckTimeout,
    ResponseTimeout,
    Cancelled,
    Remote,
    Internal,
}

/// Failure of a `send` call.
///
/// Every variant raised after validation names the logical request and
/// carries this context's own origin; variants tied to a target also name
/// its origin (or the requested pattern when none was discovered).
#[derive(Debug, Error)]
pub enum SendError {
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("Target endpoint {endpoint} ({target_origin}) unreachable for {name} in {own_origin} {phase}")]
    TargetUnreachable {
        name: String,
        own_origin: String,
        endpoint: EndpointId,
        target_origin: String,
        phase: Phase,
    },

    #[error("Origin {actual} of {endpoint} does not match {expected} for {name} in {own_origin}")]
    OriginMismatch {
        name: String,
        own_origin: String,
        endpoint: EndpointId,
        expected: String,
        actual: String,
    },

    #[error("No greeting from {endpoint} in {timeout_ms}ms")]
    HandshakeTimeout { endpoint: EndpointId, timeout_ms: u64 },

    #[error("Greeting {endpoint} failed: {source}")]
    HandshakeFailed {
        endpoint: EndpointId,
        #[source]
        source: GreetError,
    },

    #[error("Send request message failed for {name} in {own_origin}: {source}")]
    TransmissionFailure {
        name: String,
        own_origin: String,
        #[source]
        source: TransportError,
    },

    #[error("No ack for {name} to {target_origin} in {own_origin} in {timeout_ms}ms")]
    AckTimeout {
        name: String,
        own_origin: String,
        target_origin: String,
        timeout_ms: u64,
    },

    #[error("No response for {name} from {target_origin} in {own_origin} in {timeout_ms}ms")]
    ResponseTimeout {
        name: String,
        own_origin: String,
        target_origin: String,
        timeout_ms: u64,
    },

    #[error("Request {name} to {target_origin} in {own_origin} was cancelled")]
    Cancelled {
        name: String,
        own_origin: String,
        target_origin: String,
    },

    #[error("Remote handler for {name} called from {own_origin} failed: {message}")]
    Remote {
        name: String,
        own_origin: String,
        message: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SendError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        SendError::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Category of this error.
    pub fn kind(&self) -> SendErrorKind {
        match self {
            SendError::InvalidArgument { .. } => SendErrorKind::InvalidArgument,
            SendError::TargetUnreachable { .. } => SendErrorKind::TargetUnreachable,
            SendError::OriginMismatch { .. } => SendErrorKind::OriginMismatch,
            SendError::HandshakeTimeout { .. } => SendErrorKind::HandshakeTimeout,
            SendError::HandshakeFailed { .. } => SendErrorKind::HandshakeFailed,
            SendError::TransmissionFailure { .. } => SendErrorKind::TransmissionFailure,
            SendError::AckTimeout { .. } => SendErrorKind::AckTimeout,
            SendError::ResponseTimeout { .. } => SendErrorKind::ResponseTimeout,
            SendError::Cancelled { .. } => SendErrorKind::Cancelled,
            SendError::Remote { .. } => SendErrorKind::Remote,
            SendError::Internal(_) => SendErrorKind::Internal,
        }
    }

    /// Whether the request ran out of budget (ack, response or greeting).
    pub fn is_timeout(&self) -> bool {
        matches!(
            self.kind(),
            SendErrorKind::AckTimeout
                | SendErrorKind::ResponseTimeout
                | SendErrorKind::HandshakeTimeout
        )
    }
}

/// Raised synchronously by a transport that clearly cannot deliver.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("endpoint {0} is not reachable")]
    Unreachable(EndpointId),

    #[error("endpoint {0} is unknown to the transport")]
    UnknownEndpoint(EndpointId),

    #[error("message could not be encoded: {0}")]
    Encode(String),

    #[error("transport closed")]
    Closed,
}

/// Raised by a `Greeter` when a greeting cannot be performed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GreetError {
    #[error("endpoint {0} is not reachable")]
    Unreachable(EndpointId),

    #[error("greeting rejected: {0}")]
    Rejected(String),
}

/// Reasons an inbound acknowledgement or response was refused.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReceiveError {
    #[error("{kind} messages are not routed to pending requests")]
    UnexpectedKind { kind: &'static str },

    #[error("response for {key} came from {actual}, expected {expected}")]
    SourceMismatch {
        key: CorrelationKey,
        expected: EndpointId,
        actual: EndpointId,
    },

    #[error("response for {key} came from origin {actual}, expected {expected}")]
    OriginRejected {
        key: CorrelationKey,
        expected: String,
        actual: String,
    },
}

/// Configuration validation failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),

    #[error("invalid tick interval: {0}")]
    InvalidTick(String),
}
