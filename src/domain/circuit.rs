use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    #[default]
    Closed,
    Open,
    HalfOpen,
}

/// How long a circuit stays open before allowing a trial call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CooldownPolicy {
    Fixed { millis: u64 },
    /// `base_millis * 2^(opens - 1)`, capped at `max_millis`.
    Exponential { base_millis: u64, max_millis: u64 },
}

impl Default for CooldownPolicy {
    fn default() -> Self {
        CooldownPolicy::Exponential {
            base_millis: 30_000,
            max_millis: 300_000,
        }
    }
}

impl CooldownPolicy {
    /// Cool-down for the `opens`-th consecutive opening (1-based).
    pub fn cooldown(&self, opens: u32) -> Duration {
        let millis = match self {
            CooldownPolicy::Fixed { millis } => *millis,
            CooldownPolicy::Exponential {
                base_millis,
                max_millis,
            } => {
                let exponent = opens.saturating_sub(1).min(32);
                base_millis
                    .saturating_mul(1u64 << exponent)
                    .min(*max_millis)
            }
        };
        Duration::milliseconds(i64::try_from(millis).unwrap_or(i64::MAX))
    }
}

/// Breaker state for one upstream endpoint.
///
/// Transitions are pure functions returning the next record; `generation`
/// increases on every change so stores can compare-and-swap.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CircuitRecord {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub opened_until: Option<DateTime<Utc>>,
    /// Consecutive openings since the last success.
    pub opens: u32,
    pub generation: u64,
}

impl CircuitRecord {
    /// Whether a call may go through at `now`.
    pub fn permits(&self, now: DateTime<Utc>) -> bool {
        match self.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => self.cooldown_elapsed(now),
        }
    }

    pub fn cooldown_elapsed(&self, now: DateTime<Utc>) -> bool {
        self.opened_until.is_none_or(|until| now >= until)
    }

    pub fn to_half_open(&self) -> Self {
        Self {
            state: CircuitState::HalfOpen,
            generation: self.generation + 1,
            ..self.clone()
        }
    }

    pub fn on_success(&self) -> Self {
        Self {
            generation: self.generation + 1,
            ..Self::default()
        }
    }

    pub fn on_failure(&self, now: DateTime<Utc>, threshold: u32, cooldown: &CooldownPolicy) -> Self {
        let mut next = Self {
            consecutive_failures: self.consecutive_failures.saturating_add(1),
            last_failure_at: Some(now),
            generation: self.generation + 1,
            ..self.clone()
        };

        let trips = match self.state {
            CircuitState::HalfOpen => true,
            CircuitState::Closed => next.consecutive_failures >= threshold,
            CircuitState::Open => false,
        };
        if trips {
            next.state = CircuitState::Open;
            next.opens = self.opens.saturating_add(1);
            next.opened_until = Some(now + cooldown.cooldown(next.opens));
        }
        next
    }
}
