//! # pb-messenger - Reliable request/response over a fire-and-forget channel
//!
//! Adds correlation keys, acknowledgements, two-phase timeouts, origin
//! checking and cancellation on top of a raw one-way send primitive
//! between isolated execution contexts.
//!
//! # Architecture
//!
//! ```text
//!  caller ── send()/dispatch() ──┐
//!                                ▼
//!  ┌─────────────────────────────────────────────────────────┐
//!  │                     Messenger                            │
//!  │  validate → handshake → register → transmit → supervise  │
//!  └──────┬──────────────┬─────────────────┬─────────────────┘
//!         │              │                 │
//!  ┌──────┴─────┐ ┌──────┴──────┐  ┌───────┴────────┐
//!  │ Handshake  │ │  Response   │  │ Timeout loop   │
//!  │ Resolver   │ │  Registry   │◄─┤ (one per key)  │
//!  └──────┬─────┘ └──────▲──────┘  └────────────────┘
//!         │              │ ack / response
//!     Greeter        ResponseListener ◄── InboundSource
//!         │                                   ▲
//!         └────────────► Transport ───────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use pb_messenger::{Messenger, MessengerConfig, SendOptions};
//!
//! let messenger = Messenger::new(MessengerConfig::default(), probe, transport, greeter)?;
//! let reply = messenger
//!     .send(&target, "ping", json!({}), SendOptions::new().with_origin("https://a.example"))
//!     .await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ipc;
pub mod ports;
pub mod service;

pub use adapters::{InMemoryExchangeHistory, LoopbackContext, LoopbackNetwork, UuidTokenSource};
pub use domain::{
    CorrelationKey, EndpointId, MessengerConfig, OriginPattern, RegistryStats, ResponseRegistry,
    ResponseTimeout, SendOptions, WILDCARD,
};
pub use error::{
    ConfigError, GreetError, Phase, ReceiveError, SendError, SendErrorKind, TransportError,
};
pub use ipc::{Envelope, Inbound, ResponseListener, ResponseStatus};
pub use ports::{
    EndpointProbe, ExchangeHistory, Greeter, Hello, InboundSource, MessengerApi, TokenSource,
    Transport,
};
pub use service::{CancelHandle, Delivery, HandshakeResolver, Messenger, PendingResponse};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
