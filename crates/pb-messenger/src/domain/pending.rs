//! Response Registry.
//!
//! Maps correlation keys to the state of requests that are still waiting
//! for an acknowledgement or response, and keeps a per-endpoint index of
//! in-flight keys for bulk cleanup when an endpoint goes away.
//!
//! Flow:
//! 1. Orchestrator calls `register()` and `track()` before transmitting
//! 2. Inbound acks call `mark_acknowledged()`
//! 3. Exactly one of response / timeout / cancellation / teardown calls `settle()`
//! 4. `settle()` deregisters, untracks, stops the tick and delivers the outcome
//!
//! All mutations happen under one mutex, so every transition is atomic with
//! respect to the others even on a multi-threaded runtime.

use crate::domain::correlation::CorrelationKey;
use crate::domain::endpoint::EndpointId;
use crate::error::{SendError, SendErrorKind};
use crate::service::supervisor::{TickHandle, TickStatus};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::debug;

/// Outcome delivered to the caller awaiting a request.
pub type Settlement = Result<Value, SendError>;

/// How many settled-by-error keys are remembered for quiet late-arrival handling.
const ERRORED_KEY_MEMORY: usize = 1024;

/// A request waiting for its acknowledgement and response.
pub struct PendingEntry {
    /// Logical request name (for logging and errors)
    pub name: String,
    /// Endpoint the request was sent to
    pub target: EndpointId,
    /// Origin the request was transmitted to (`*` accepts any)
    pub expected_origin: String,
    /// Set once the target confirms receipt
    pub acknowledged: bool,
    /// Set by external cancellation, observed by the next tick
    pub cancelled: bool,
    sender: oneshot::Sender<Settlement>,
    tick: Option<TickHandle>,
    created_at: Instant,
}

impl PendingEntry {
    /// Create an entry and the receiver its settlement will be delivered to.
    pub fn new(
        name: impl Into<String>,
        target: EndpointId,
        expected_origin: impl Into<String>,
    ) -> (Self, oneshot::Receiver<Settlement>) {
        let (sender, receiver) = oneshot::channel();
        let entry = Self {
            name: name.into(),
            target,
            expected_origin: expected_origin.into(),
            acknowledged: false,
            cancelled: false,
            sender,
            tick: None,
            created_at: Instant::now(),
        };
        (entry, receiver)
    }
}

/// Snapshot of the flags the timeout loop reads each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryState {
    pub acknowledged: bool,
    pub cancelled: bool,
    /// The caller dropped its receiver; nobody is waiting any more.
    pub abandoned: bool,
}

/// Read-only view of an entry for inbound validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub name: String,
    pub target: EndpointId,
    pub expected_origin: String,
    pub acknowledged: bool,
}

/// Statistics for the response registry
#[derive(Debug, Default)]
pub struct RegistryStats {
    /// Total requests registered
    pub total_registered: AtomicU64,
    /// Total requests settled with a response
    pub total_completed: AtomicU64,
    /// Total requests that ran out of ack or response budget
    pub total_timeouts: AtomicU64,
    /// Total requests cancelled (explicitly or by dropping the receiver)
    pub total_cancelled: AtomicU64,
    /// Total requests failed for any other reason
    pub total_failed: AtomicU64,
}

#[derive(Default)]
struct RegistryInner {
    pending: HashMap<CorrelationKey, PendingEntry>,
    tracked: HashMap<EndpointId, Vec<CorrelationKey>>,
    errored: HashSet<CorrelationKey>,
    errored_order: VecDeque<CorrelationKey>,
}

impl RegistryInner {
    fn untrack(&mut self, endpoint: &EndpointId, key: &CorrelationKey) -> bool {
        let Some(keys) = self.tracked.get_mut(endpoint) else {
            return false;
        };
        let Some(position) = keys.iter().position(|tracked| tracked == key) else {
            return false;
        };
        keys.remove(position);
        if keys.is_empty() {
            self.tracked.remove(endpoint);
        }
        true
    }

    fn remember_errored(&mut self, key: CorrelationKey) {
        if self.errored.insert(key.clone()) {
            self.errored_order.push_back(key);
        }
        while self.errored_order.len() > ERRORED_KEY_MEMORY {
            if let Some(oldest) = self.errored_order.pop_front() {
                self.errored.remove(&oldest);
            }
        }
    }
}

/// Registry of in-flight requests.
#[derive(Default)]
pub struct ResponseRegistry {
    inner: Mutex<RegistryInner>,
    stats: RegistryStats,
}

impl ResponseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pending entry.
    ///
    /// A key collision is an internal invariant violation; the existing
    /// entry is left untouched.
    pub fn register(&self, key: CorrelationKey, entry: PendingEntry) -> Result<(), SendError> {
        let mut inner = self.inner.lock();
        if inner.pending.contains_key(&key) {
            return Err(SendError::Internal(format!(
                "correlation key collision for {key}"
            )));
        }

        debug!(
            correlation_key = %key,
            name = %entry.name,
            endpoint = %entry.target,
            "Registered pending request"
        );
        inner.pending.insert(key, entry);
        self.stats.total_registered.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Add a key to an endpoint's in-flight set.
    pub fn track(&self, endpoint: &EndpointId, key: &CorrelationKey) {
        let mut inner = self.inner.lock();
        let keys = inner.tracked.entry(endpoint.clone()).or_default();
        if !keys.contains(key) {
            keys.push(key.clone());
        }
    }

    /// Remove a key from an endpoint's in-flight set by identity.
    pub fn untrack(&self, endpoint: &EndpointId, key: &CorrelationKey) -> bool {
        self.inner.lock().untrack(endpoint, key)
    }

    /// Keys currently in flight to `endpoint`, in registration order.
    pub fn tracked(&self, endpoint: &EndpointId) -> Vec<CorrelationKey> {
        self.inner
            .lock()
            .tracked
            .get(endpoint)
            .cloned()
            .unwrap_or_default()
    }

    /// Attach the tick handle to a registered entry.
    ///
    /// Hands the handle back if the entry already settled, so the caller
    /// can cancel it.
    pub fn attach_tick(&self, key: &CorrelationKey, handle: TickHandle) -> Result<(), TickHandle> {
        match self.inner.lock().pending.get_mut(key) {
            Some(entry) => {
                entry.tick = Some(handle);
                Ok(())
            }
            None => Err(handle),
        }
    }

    /// Status of the timeout loop attached to a pending entry.
    pub fn tick_status(&self, key: &CorrelationKey) -> Option<TickStatus> {
        self.inner
            .lock()
            .pending
            .get(key)
            .and_then(|entry| entry.tick.as_ref().map(TickHandle::status))
    }

    /// Record an acknowledgement. Returns false if the key is not pending.
    pub fn mark_acknowledged(&self, key: &CorrelationKey) -> bool {
        match self.inner.lock().pending.get_mut(key) {
            Some(entry) => {
                entry.acknowledged = true;
                true
            }
            None => false,
        }
    }

    /// Request cancellation. Returns false if the key is not pending.
    pub fn mark_cancelled(&self, key: &CorrelationKey) -> bool {
        match self.inner.lock().pending.get_mut(key) {
            Some(entry) => {
                entry.cancelled = true;
                true
            }
            None => false,
        }
    }

    pub fn state(&self, key: &CorrelationKey) -> Option<EntryState> {
        self.inner.lock().pending.get(key).map(|entry| EntryState {
            acknowledged: entry.acknowledged,
            cancelled: entry.cancelled,
            abandoned: entry.sender.is_closed(),
        })
    }

    pub fn info(&self, key: &CorrelationKey) -> Option<EntryInfo> {
        self.inner.lock().pending.get(key).map(|entry| EntryInfo {
            name: entry.name.clone(),
            target: entry.target.clone(),
            expected_origin: entry.expected_origin.clone(),
            acknowledged: entry.acknowledged,
        })
    }

    /// Settle a request: deregister it, untrack it, stop its tick and
    /// deliver `outcome`.
    ///
    /// Idempotent; only the first call for a key has any effect. Returns
    /// whether this call settled the request.
    pub fn settle(&self, key: &CorrelationKey, outcome: Settlement) -> bool {
        let entry = {
            let mut inner = self.inner.lock();
            let Some(entry) = inner.pending.remove(key) else {
                return false;
            };
            inner.untrack(&entry.target, key);
            if outcome.is_err() {
                inner.remember_errored(key.clone());
            }
            entry
        };

        if let Some(tick) = entry.tick {
            tick.cancel();
        }

        self.record_outcome(&outcome);
        let elapsed = entry.created_at.elapsed();
        let failure = outcome.as_ref().err().map(ToString::to_string);

        if entry.sender.send(outcome).is_err() {
            debug!(
                correlation_key = %key,
                name = %entry.name,
                "Pending request receiver dropped before settlement"
            );
        } else {
            debug!(
                correlation_key = %key,
                name = %entry.name,
                elapsed_ms = duration_ms(elapsed),
                error = failure.as_deref().unwrap_or(""),
                "Settled pending request"
            );
        }
        true
    }

    /// Whether `key` was settled with an error recently.
    pub fn is_errored(&self, key: &CorrelationKey) -> bool {
        self.inner.lock().errored.contains(key)
    }

    pub fn is_pending(&self, key: &CorrelationKey) -> bool {
        self.inner.lock().pending.contains_key(key)
    }

    /// Number of pending requests.
    pub fn len(&self) -> usize {
        self.inner.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> &RegistryStats {
        &self.stats
    }

    fn record_outcome(&self, outcome: &Settlement) {
        let counter = match outcome {
            Ok(_) => &self.stats.total_completed,
            Err(err) => match err.kind() {
                SendErrorKind::Cancelled => &self.stats.total_cancelled,
                SendErrorKind::AckTimeout | SendErrorKind::ResponseTimeout => {
                    &self.stats.total_timeouts
                }
                _ => &self.stats.total_failed,
            },
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
