//! Retry decisions for upstream attempts.
//!
//! The policy is a plain state machine: feed it the outcome of each attempt
//! and it answers with the delay before the next one or tells the caller to
//! stop. It never sleeps itself, so it does not care which runtime drives it.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Classification of a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    /// Network errors, timeouts, HTTP 429 and 5xx.
    Retryable,
    /// Any other 4xx and malformed responses.
    NonRetryable,
}

impl AttemptOutcome {
    pub fn from_status(status: u16) -> Self {
        match status {
            200..=299 => AttemptOutcome::Success,
            429 | 500..=599 => AttemptOutcome::Retryable,
            _ => AttemptOutcome::NonRetryable,
        }
    }
}

/// Why a retry loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Succeeded,
    NonRetryable,
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    Stop(StopReason),
}

/// Delay before each attempt. Attempt 0 never waits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackoffSchedule {
    /// Explicit delays indexed by attempt; the last entry repeats.
    Table { delays_ms: Vec<u64> },
    /// `base_ms * 2^(attempt - 1)` capped at `max_ms`.
    Exponential { base_ms: u64, max_ms: u64 },
}

impl Default for BackoffSchedule {
    fn default() -> Self {
        BackoffSchedule::Table {
            delays_ms: vec![0, 200, 500],
        }
    }
}

impl BackoffSchedule {
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let millis = match self {
            BackoffSchedule::Table { delays_ms } => delays_ms
                .get(attempt as usize)
                .or(delays_ms.last())
                .copied()
                .unwrap_or(0),
            BackoffSchedule::Exponential { base_ms, max_ms } => {
                let exponent = (attempt - 1).min(32);
                base_ms.saturating_mul(1u64 << exponent).min(*max_ms)
            }
        };
        Duration::from_millis(millis)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: BackoffSchedule,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffSchedule::default(),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: BackoffSchedule) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Decision after attempt number `attempt` (0-based) ended with `outcome`.
    pub fn decide(&self, outcome: AttemptOutcome, attempt: u32) -> RetryDecision {
        match outcome {
            AttemptOutcome::Success => RetryDecision::Stop(StopReason::Succeeded),
            AttemptOutcome::NonRetryable => RetryDecision::Stop(StopReason::NonRetryable),
            AttemptOutcome::Retryable if attempt + 1 >= self.max_attempts => {
                RetryDecision::Stop(StopReason::Exhausted)
            }
            AttemptOutcome::Retryable => {
                RetryDecision::RetryAfter(self.backoff.delay_before(attempt + 1))
            }
        }
    }

    pub fn start(&self) -> RetryState<'_> {
        RetryState {
            policy: self,
            attempt: 0,
            next_delay: self.backoff.delay_before(0),
            stopped: None,
        }
    }
}

/// Progress of one logical call through its attempts.
#[derive(Debug, Clone)]
pub struct RetryState<'a> {
    policy: &'a RetryPolicy,
    attempt: u32,
    next_delay: Duration,
    stopped: Option<StopReason>,
}

impl RetryState<'_> {
    /// Index of the attempt about to be made.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Attempts completed so far.
    pub fn attempts_made(&self) -> u32 {
        if self.stopped.is_some() {
            self.attempt + 1
        } else {
            self.attempt
        }
    }

    /// How long to wait before the current attempt.
    pub fn next_delay(&self) -> Duration {
        self.next_delay
    }

    pub fn stopped(&self) -> Option<StopReason> {
        self.stopped
    }

    /// Records the outcome of the current attempt and advances.
    pub fn record(&mut self, outcome: AttemptOutcome) -> RetryDecision {
        if let Some(reason) = self.stopped {
            return RetryDecision::Stop(reason);
        }
        let decision = self.policy.decide(outcome, self.attempt);
        match decision {
            RetryDecision::RetryAfter(delay) => {
                self.attempt += 1;
                self.next_delay = delay;
            }
            RetryDecision::Stop(reason) => self.stopped = Some(reason),
        }
        decision
    }
}
