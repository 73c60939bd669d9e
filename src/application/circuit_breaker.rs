use crate::domain::circuit::{CircuitRecord, CircuitState, CooldownPolicy};
use crate::domain::ports::{CircuitStateStoreBox, ClockRef};
use crate::error::{ConditionsError, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Upper bound on optimistic retries when racing other callers on one endpoint.
const MAX_CAS_ATTEMPTS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open a closed circuit.
    pub failure_threshold: u32,
    pub cooldown: CooldownPolicy,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: CooldownPolicy::default(),
        }
    }
}

/// Failure gate for upstream endpoints.
///
/// The breaker itself is stateless: every transition is a compare-and-swap
/// against the injected `CircuitStateStore`, which keeps concurrent callers on
/// the same endpoint linearizable and lets several breakers share one store.
pub struct CircuitBreaker {
    store: CircuitStateStoreBox,
    clock: ClockRef,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(store: CircuitStateStoreBox, clock: ClockRef, config: CircuitBreakerConfig) -> Self {
        Self {
            store,
            clock,
            config: CircuitBreakerConfig {
                failure_threshold: config.failure_threshold.max(1),
                ..config
            },
        }
    }

    /// Whether a call to `endpoint` may proceed.
    ///
    /// An open circuit whose cool-down has elapsed moves to half-open and lets
    /// the caller through as a trial.
    pub async fn allow(&self, endpoint: &str) -> Result<bool> {
        for _ in 0..MAX_CAS_ATTEMPTS {
            let record = self.store.load(endpoint).await?;
            let now = self.clock.now();
            match record.state {
                CircuitState::Closed | CircuitState::HalfOpen => return Ok(true),
                CircuitState::Open if !record.cooldown_elapsed(now) => return Ok(false),
                CircuitState::Open => {
                    let next = record.to_half_open();
                    if self.store.compare_and_swap(endpoint, &record, next).await? {
                        info!(endpoint, "circuit half-open, allowing trial call");
                        return Ok(true);
                    }
                }
            }
        }
        Err(contended(endpoint))
    }

    pub async fn record_success(&self, endpoint: &str) -> Result<()> {
        for _ in 0..MAX_CAS_ATTEMPTS {
            let record = self.store.load(endpoint).await?;
            if record.state == CircuitState::Closed && record.consecutive_failures == 0 {
                return Ok(());
            }
            let next = record.on_success();
            if self.store.compare_and_swap(endpoint, &record, next).await? {
                if record.state != CircuitState::Closed {
                    info!(endpoint, "circuit closed");
                }
                return Ok(());
            }
        }
        Err(contended(endpoint))
    }

    /// Counts one failed logical call and returns the resulting record.
    pub async fn record_failure(&self, endpoint: &str) -> Result<CircuitRecord> {
        for _ in 0..MAX_CAS_ATTEMPTS {
            let record = self.store.load(endpoint).await?;
            let next = record.on_failure(
                self.clock.now(),
                self.config.failure_threshold,
                &self.config.cooldown,
            );
            if self
                .store
                .compare_and_swap(endpoint, &record, next.clone())
                .await?
            {
                if next.state == CircuitState::Open && record.state != CircuitState::Open {
                    warn!(
                        endpoint,
                        consecutive_failures = next.consecutive_failures,
                        opens = next.opens,
                        opened_until = ?next.opened_until,
                        "circuit opened"
                    );
                }
                return Ok(next);
            }
        }
        Err(contended(endpoint))
    }

    pub async fn state(&self, endpoint: &str) -> Result<CircuitState> {
        Ok(self.store.load(endpoint).await?.state)
    }

    pub async fn record(&self, endpoint: &str) -> Result<CircuitRecord> {
        self.store.load(endpoint).await
    }

    /// Forces the circuit closed, e.g. after an operator confirms recovery.
    pub async fn reset(&self, endpoint: &str) -> Result<()> {
        for _ in 0..MAX_CAS_ATTEMPTS {
            let record = self.store.load(endpoint).await?;
            if self
                .store
                .compare_and_swap(endpoint, &record, record.on_success())
                .await?
            {
                return Ok(());
            }
        }
        Err(contended(endpoint))
    }
}

fn contended(endpoint: &str) -> ConditionsError {
    ConditionsError::Store(format!("circuit state for {endpoint} is too contended"))
}
