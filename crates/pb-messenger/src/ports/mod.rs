//! Ports (hexagonal boundaries).

pub mod inbound;
pub mod outbound;

pub use inbound::MessengerApi;
pub use outbound::{
    EndpointProbe, ExchangeHistory, Greeter, Hello, InboundSource, TokenSource, Transport,
};
