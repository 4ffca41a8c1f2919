//! # Retry Schedules
//!
//! Two policies for waiting on the transport:
//!
//! - **Fixed**: same delay forever (battle synchronizer)
//! - **Exponential**: `min(base * 2^(n-1), ceiling)` with a retry budget
//!   (draft synchronizer: 1s, 2s, 4s, 8s, 10s, then give up)

use std::time::{Duration, Instant};

/// How long to wait between connect attempts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Constant delay, unlimited attempts.
    Fixed {
        /// Delay between attempts.
        delay: Duration,
    },
    /// Doubling delay with a ceiling and a budget.
    Exponential {
        /// First delay.
        base: Duration,
        /// Largest delay.
        ceiling: Duration,
        /// Attempts before giving up.
        max_retries: u32,
    },
}

impl RetryPolicy {
    /// Delay before the retry following attempt `attempt` (1-based).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Self::Fixed { delay } => delay,
            Self::Exponential { base, ceiling, .. } => {
                let shift = attempt.saturating_sub(1).min(31);
                base.saturating_mul(1u32 << shift).min(ceiling)
            }
        }
    }

    /// Attempt budget, `None` for unlimited.
    #[must_use]
    pub const fn max_retries(&self) -> Option<u32> {
        match *self {
            Self::Fixed { .. } => None,
            Self::Exponential { max_retries, .. } => Some(max_retries),
        }
    }
}

/// Attempt counter plus the next deadline.
///
/// The deadline is plain data: nothing fires on its own. Clearing it is
/// how a synchronizer cancels a pending retry.
#[derive(Clone, Debug)]
pub struct RetrySchedule {
    policy: RetryPolicy,
    attempts: u32,
    next_at: Option<Instant>,
}

/// What to do after a failed attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again at this instant.
    RetryAt(Instant),
    /// Budget spent.
    GiveUp {
        /// Attempts made.
        attempts: u32,
    },
}

impl RetrySchedule {
    /// Fresh schedule.
    #[must_use]
    pub const fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
            next_at: None,
        }
    }

    /// Policy in force.
    #[must_use]
    pub const fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Attempts since the last reset.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Pending deadline.
    #[must_use]
    pub const fn next_at(&self) -> Option<Instant> {
        self.next_at
    }

    /// True if a deadline is set and has passed.
    #[must_use]
    pub fn is_due(&self, now: Instant) -> bool {
        self.next_at.is_some_and(|at| now >= at)
    }

    /// Records a failed attempt at `now` and decides what comes next.
    pub fn record_failure(&mut self, now: Instant) -> RetryDecision {
        if let Some(max) = self.policy.max_retries() {
            if self.attempts >= max {
                self.next_at = None;
                return RetryDecision::GiveUp {
                    attempts: self.attempts,
                };
            }
        }
        self.attempts += 1;
        let at = now + self.policy.delay(self.attempts);
        self.next_at = Some(at);
        RetryDecision::RetryAt(at)
    }

    /// Connected: forget past failures.
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.next_at = None;
    }

    /// Drops the pending deadline, keeping the attempt count.
    pub fn cancel(&mut self) {
        self.next_at = None;
    }
}
