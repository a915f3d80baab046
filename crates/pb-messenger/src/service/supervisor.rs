//! Timeout loop for a tracked request.
//!
//! One task per request ticks at the configured interval until the request
//! settles. Each tick checks, in order: target reachability, cancellation,
//! then the two-phase clock. Settlement from any other path (response,
//! bulk teardown) cancels the task through its `TickHandle`.

use crate::domain::clock::{ClockVerdict, TimeoutClock};
use crate::domain::correlation::CorrelationKey;
use crate::domain::endpoint::EndpointId;
use crate::domain::pending::ResponseRegistry;
use crate::error::{Phase, SendError};
use crate::ports::outbound::EndpointProbe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::AbortHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn};

/// Handle to a scheduled timeout loop.
#[derive(Debug)]
pub struct TickHandle {
    abort: AbortHandle,
    status: TickStatus,
}

impl TickHandle {
    /// Stop the loop. Safe to call on a loop that already finished.
    pub fn cancel(self) {
        self.abort.abort();
    }

    /// Observer that outlives the handle.
    pub fn status(&self) -> TickStatus {
        self.status.clone()
    }
}

/// Whether a timeout loop has stopped, by returning or by being aborted.
#[derive(Debug, Clone, Default)]
pub struct TickStatus {
    finished: Arc<AtomicBool>,
}

impl TickStatus {
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

/// Flips the status when the loop's future is dropped.
struct Finished(TickStatus);

impl Drop for Finished {
    fn drop(&mut self) {
        self.0.finished.store(true, Ordering::Release);
    }
}

/// Everything the loop needs to settle a request on its own.
pub(crate) struct Supervision {
    pub key: CorrelationKey,
    pub log_name: String,
    pub target: EndpointId,
    pub target_origin: String,
    pub own_origin: String,
    pub tick: Duration,
    pub clock: TimeoutClock,
}

/// Spawn the timeout loop for a registered request.
pub(crate) fn spawn(
    registry: Arc<ResponseRegistry>,
    probe: Arc<dyn EndpointProbe>,
    supervision: Supervision,
) -> TickHandle {
    let status = TickStatus::default();
    let guard = Finished(status.clone());
    let task = tokio::spawn(async move {
        let _guard = guard;
        run(registry, probe, supervision).await;
    });
    TickHandle {
        abort: task.abort_handle(),
        status,
    }
}

async fn run(
    registry: Arc<ResponseRegistry>,
    probe: Arc<dyn EndpointProbe>,
    mut supervision: Supervision,
) {
    let mut interval = time::interval_at(Instant::now() + supervision.tick, supervision.tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        let Some(state) = registry.state(&supervision.key) else {
            // Settled out of band
            return;
        };

        if !probe.is_reachable(&supervision.target) {
            let phase = Phase::from_ack(state.acknowledged);
            warn!(
                correlation_key = %supervision.key,
                endpoint = %supervision.target,
                %phase,
                "Target became unreachable"
            );
            registry.settle(
                &supervision.key,
                Err(SendError::TargetUnreachable {
                    name: supervision.log_name.clone(),
                    own_origin: supervision.own_origin.clone(),
                    endpoint: supervision.target.clone(),
                    target_origin: supervision.target_origin.clone(),
                    phase,
                }),
            );
            return;
        }

        if state.cancelled || state.abandoned {
            debug!(
                correlation_key = %supervision.key,
                abandoned = state.abandoned,
                "Cancelling pending request"
            );
            registry.settle(
                &supervision.key,
                Err(SendError::Cancelled {
                    name: supervision.log_name.clone(),
                    own_origin: supervision.own_origin.clone(),
                    target_origin: supervision.target_origin.clone(),
                }),
            );
            return;
        }

        let failure = match supervision.clock.advance(state.acknowledged) {
            ClockVerdict::Running => continue,
            ClockVerdict::AckExpired { budget } => SendError::AckTimeout {
                name: supervision.log_name.clone(),
                own_origin: supervision.own_origin.clone(),
                target_origin: supervision.target_origin.clone(),
                timeout_ms: millis(budget),
            },
            ClockVerdict::ResponseExpired { budget } => SendError::ResponseTimeout {
                name: supervision.log_name.clone(),
                own_origin: supervision.own_origin.clone(),
                target_origin: supervision.target_origin.clone(),
                timeout_ms: millis(budget),
            },
        };

        warn!(
            correlation_key = %supervision.key,
            ticks = supervision.clock.ticks(),
            error = %failure,
            "Pending request timed out"
        );
        registry.settle(&supervision.key, Err(failure));
        return;
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
