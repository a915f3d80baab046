//! Two-phase timeout clock.
//!
//! Pure countdown state for one request: an ack budget and a response
//! budget, both decremented by the same tick and floored at zero. The
//! response budget may be unbounded, in which case it never expires.

use crate::domain::config::ResponseTimeout;
use std::time::Duration;

/// Result of advancing the clock by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockVerdict {
    /// Neither budget is exhausted.
    Running,
    /// No acknowledgement within the ack budget.
    AckExpired { budget: Duration },
    /// No response within the response budget.
    ResponseExpired { budget: Duration },
}

/// Countdown for one request's ack and response phases.
#[derive(Debug, Clone)]
pub struct TimeoutClock {
    tick: Duration,
    ack_budget: Duration,
    ack_remaining: Duration,
    response_budget: ResponseTimeout,
    response_remaining: Option<Duration>,
    ticks: u64,
}

impl TimeoutClock {
    pub fn new(tick: Duration, ack_budget: Duration, response_budget: ResponseTimeout) -> Self {
        Self {
            tick,
            ack_budget,
            ack_remaining: ack_budget,
            response_budget,
            response_remaining: response_budget.as_duration(),
            ticks: 0,
        }
    }

    /// Advance one tick.
    ///
    /// The ack budget keeps counting down after acknowledgement but only
    /// fires while unacknowledged; an ack expiry takes precedence over a
    /// response expiry on the same tick.
    pub fn advance(&mut self, acknowledged: bool) -> ClockVerdict {
        self.ticks += 1;
        self.ack_remaining = self.ack_remaining.saturating_sub(self.tick);
        if let Some(remaining) = self.response_remaining.as_mut() {
            *remaining = remaining.saturating_sub(self.tick);
        }

        if !acknowledged && self.ack_remaining.is_zero() {
            return ClockVerdict::AckExpired {
                budget: self.ack_budget,
            };
        }

        match (self.response_remaining, self.response_budget) {
            (Some(remaining), ResponseTimeout::Bounded(budget)) if remaining.is_zero() => {
                ClockVerdict::ResponseExpired { budget }
            }
            _ => ClockVerdict::Running,
        }
    }

    pub fn ack_remaining(&self) -> Duration {
        self.ack_remaining
    }

    /// `None` when the response budget is unbounded.
    pub fn response_remaining(&self) -> Option<Duration> {
        self.response_remaining
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}
