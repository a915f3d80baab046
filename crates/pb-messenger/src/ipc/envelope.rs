//! Wire envelope exchanged between endpoints.
//!
//! Only the fields are fixed here; the encoding is the transport's concern.
//! The serde representation is internally tagged by `type`.

use crate::domain::correlation::CorrelationKey;
use crate::domain::endpoint::EndpointId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome reported in a response envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Message exchanged over the fire-and-forget primitive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    /// Outgoing call.
    Request {
        hash: CorrelationKey,
        name: String,
        data: Value,
        #[serde(rename = "fireAndForget", default)]
        fire_and_forget: bool,
    },
    /// Receipt confirmation for a request.
    Ack { hash: CorrelationKey, name: String },
    /// Final answer for a request.
    Response {
        hash: CorrelationKey,
        name: String,
        ack: ResponseStatus,
        #[serde(default)]
        data: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl Envelope {
    /// Correlation key carried by every envelope.
    pub fn hash(&self) -> &CorrelationKey {
        match self {
            Envelope::Request { hash, .. }
            | Envelope::Ack { hash, .. }
            | Envelope::Response { hash, .. } => hash,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Envelope::Request { name, .. }
            | Envelope::Ack { name, .. }
            | Envelope::Response { name, .. } => name,
        }
    }

    /// Short label for logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Envelope::Request { .. } => "request",
            Envelope::Ack { .. } => "ack",
            Envelope::Response { .. } => "response",
        }
    }

    /// Acknowledgement for a received request.
    pub fn ack_for(hash: &CorrelationKey, name: &str) -> Self {
        Envelope::Ack {
            hash: hash.clone(),
            name: name.to_string(),
        }
    }

    /// Successful response for a received request.
    pub fn success_for(hash: &CorrelationKey, name: &str, data: Value) -> Self {
        Envelope::Response {
            hash: hash.clone(),
            name: name.to_string(),
            ack: ResponseStatus::Success,
            data,
            error: None,
        }
    }

    /// Failed response for a received request.
    pub fn error_for(hash: &CorrelationKey, name: &str, message: impl Into<String>) -> Self {
        Envelope::Response {
            hash: hash.clone(),
            name: name.to_string(),
            ack: ResponseStatus::Error,
            data: Value::Null,
            error: Some(message.into()),
        }
    }
}

/// An envelope together with where it came from.
#[derive(Clone, Debug, PartialEq)]
pub struct Inbound {
    pub source: EndpointId,
    pub origin: String,
    pub envelope: Envelope,
}
