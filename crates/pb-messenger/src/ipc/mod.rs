//! Wire messages and inbound routing.

pub mod envelope;
pub mod handler;

pub use envelope::{Envelope, Inbound, ResponseStatus};
pub use handler::ResponseListener;
