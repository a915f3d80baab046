//! # Inbound Port - MessengerApi
//!
//! Primary driving port: what callers and the inbound listener use.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{CorrelationKey, EndpointId, SendOptions};
use crate::error::{ReceiveError, SendError};
use crate::ipc::envelope::Inbound;
use crate::service::messenger::{Delivery, Messenger};

/// Request/response API over a fire-and-forget channel.
///
/// # Example
///
/// ```rust,ignore
/// use pb_messenger::ports::MessengerApi;
///
/// async fn example(api: &impl MessengerApi, target: &EndpointId) {
///     let reply = api.send(target, "ping", json!({}), SendOptions::new()).await;
/// }
/// ```
#[async_trait]
pub trait MessengerApi: Send + Sync {
    /// Send a request to `target` and wait for its settlement.
    ///
    /// # Errors
    /// - `InvalidArgument`: empty name or malformed options
    /// - `TargetUnreachable`: target gone before send, ack or response
    /// - `OriginMismatch`: discovered origin outside the allowed pattern
    /// - `AckTimeout` / `ResponseTimeout`: budget exhausted
    /// - `Cancelled`: cancelled while in flight
    async fn send(
        &self,
        target: &EndpointId,
        name: &str,
        payload: Value,
        options: SendOptions,
    ) -> Result<Value, SendError>;

    /// Request cancellation of an in-flight request.
    fn cancel(&self, key: &CorrelationKey) -> bool;

    /// Route an inbound acknowledgement or response.
    fn receive(&self, inbound: Inbound) -> Result<Delivery, ReceiveError>;

    /// Reject everything in flight to a torn down endpoint.
    fn reject_endpoint(&self, endpoint: &EndpointId) -> usize;
}

#[async_trait]
impl MessengerApi for Messenger {
    async fn send(
        &self,
        target: &EndpointId,
        name: &str,
        payload: Value,
        options: SendOptions,
    ) -> Result<Value, SendError> {
        Messenger::send(self, target, name, payload, options).await
    }

    fn cancel(&self, key: &CorrelationKey) -> bool {
        Messenger::cancel(self, key)
    }

    fn receive(&self, inbound: Inbound) -> Result<Delivery, ReceiveError> {
        Messenger::receive(self, inbound)
    }

    fn reject_endpoint(&self, endpoint: &EndpointId) -> usize {
        Messenger::reject_endpoint(self, endpoint)
    }
}
