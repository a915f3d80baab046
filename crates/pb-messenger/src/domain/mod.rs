//! Domain types for the messenger.
//!
//! Pure state and rules: origins, correlation keys, timeouts and the
//! registry of in-flight requests. No I/O happens here.

pub mod clock;
pub mod config;
pub mod correlation;
pub mod endpoint;
pub mod options;
pub mod origin;
pub mod pending;

// Re-exports for convenience
pub use clock::{ClockVerdict, TimeoutClock};
pub use config::{MessengerConfig, ResponseTimeout, UNBOUNDED_MS};
pub use correlation::CorrelationKey;
pub use endpoint::EndpointId;
pub use options::SendOptions;
pub use origin::{OriginPattern, WILDCARD};
pub use pending::{EntryInfo, EntryState, PendingEntry, RegistryStats, ResponseRegistry, Settlement};
