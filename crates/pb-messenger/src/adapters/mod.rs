//! Adapters for the outbound ports.

pub mod history;
pub mod loopback;
pub mod token;

pub use history::InMemoryExchangeHistory;
pub use loopback::{LoopbackContext, LoopbackNetwork};
pub use token::UuidTokenSource;
