//! Messenger service: orchestration, handshakes and timeout supervision.

pub mod handshake;
pub mod messenger;
pub mod supervisor;


pub use handshake::HandshakeResolver;
pub use messenger::{
    display_name, CancelHandle, Delivery, Messenger, PendingResponse, METHOD_MESSAGE_NAME,
};
pub use supervisor::{TickHandle, TickStatus};
