//! # PostBridge Test Suite
//!
//! End-to-end flows between messengers on the in-process loopback network.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── harness.rs        # Loopback world: parent messenger + scripted child
//! └── integration/      # Request/response flows across contexts
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p pb-tests
//!
//! # With messenger logs
//! PB_LOG_LEVEL=pb_messenger=debug cargo test -p pb-tests -- --nocapture
//! ```

#[cfg(test)]
pub mod harness;
pub mod integration;
