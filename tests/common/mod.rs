#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use installment_conditions::application::cache::ConditionsCache;
use installment_conditions::application::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use installment_conditions::application::client::{ClientConfig, ResilientClient};
use installment_conditions::application::idempotency::IDEMPOTENCY_KEY_HEADER;
use installment_conditions::application::normalizer::InstallmentNormalizer;
use installment_conditions::application::service::PaymentConditionsService;
use installment_conditions::domain::cart::{CartSnapshot, LineItem};
use installment_conditions::domain::money::{Currency, Money};
use installment_conditions::domain::circuit::CircuitRecord;
use installment_conditions::domain::ports::{
    CacheStore, CacheStoreBox, CachedValue, CircuitStateStore, CircuitStateStoreBox, Clock,
    ClockRef, ConditionsUpstream, UpstreamRequest, UpstreamResponse,
};
use installment_conditions::error::{ConditionsError, Result};
use installment_conditions::infrastructure::in_memory::{InMemoryCacheStore, InMemoryCircuitStore};
use serde_json::json;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const ENDPOINT: &str = "http://conditions.test/v1/installments";

/// One scripted reaction of the fake upstream.
#[derive(Debug, Clone)]
pub enum Step {
    Respond(u16, String),
    /// Answers only after the given delay; used to trip per-attempt timeouts.
    Delayed(Duration, u16, String),
    TransportError(String),
}

impl Step {
    pub fn ok(body: impl Into<String>) -> Self {
        Step::Respond(200, body.into())
    }

    pub fn status(status: u16) -> Self {
        Step::Respond(status, String::new())
    }

    pub fn hang(delay: Duration) -> Self {
        Step::Delayed(delay, 200, String::new())
    }
}

#[derive(Default)]
struct Script {
    steps: VecDeque<Step>,
    requests: Vec<UpstreamRequest>,
    sent_at: Vec<tokio::time::Instant>,
    applied_keys: HashSet<String>,
    effects: usize,
}

/// Upstream double that replays a script and records every attempt.
///
/// Clones share the same script, so a test keeps a handle after boxing one
/// into the client. Requests carrying an `Idempotency-Key` apply their effect
/// at most once per key, like the real service.
#[derive(Clone)]
pub struct ScriptedUpstream {
    endpoint: String,
    script: Arc<Mutex<Script>>,
    fallback: Step,
}

impl ScriptedUpstream {
    pub fn new(steps: Vec<Step>) -> Self {
        Self::at(ENDPOINT, steps)
    }

    pub fn at(endpoint: &str, steps: Vec<Step>) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            script: Arc::new(Mutex::new(Script {
                steps: steps.into(),
                ..Script::default()
            })),
            fallback: Step::status(500),
        }
    }

    /// Step used once the script has run out.
    pub fn otherwise(mut self, step: Step) -> Self {
        self.fallback = step;
        self
    }

    pub fn attempts(&self) -> usize {
        self.script.lock().unwrap().requests.len()
    }

    pub fn requests(&self) -> Vec<UpstreamRequest> {
        self.script.lock().unwrap().requests.clone()
    }

    pub fn sent_at(&self) -> Vec<tokio::time::Instant> {
        self.script.lock().unwrap().sent_at.clone()
    }

    /// Side effects actually applied upstream.
    pub fn effects(&self) -> usize {
        self.script.lock().unwrap().effects
    }
}

#[async_trait]
impl ConditionsUpstream for ScriptedUpstream {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, request: &UpstreamRequest) -> Result<UpstreamResponse> {
        let step = {
            let mut script = self.script.lock().unwrap();
            script.requests.push(request.clone());
            script.sent_at.push(tokio::time::Instant::now());
            let step = script.steps.pop_front().unwrap_or(self.fallback.clone());
            if matches!(
                step,
                Step::Respond(200..=299, _) | Step::Delayed(_, 200..=299, _)
            ) {
                match request.headers.get(IDEMPOTENCY_KEY_HEADER) {
                    Some(key) => {
                        if script.applied_keys.insert(key.clone()) {
                            script.effects += 1;
                        }
                    }
                    None => script.effects += 1,
                }
            }
            step
        };

        match step {
            Step::Respond(status, body) => Ok(UpstreamResponse { status, body }),
            Step::Delayed(delay, status, body) => {
                tokio::time::sleep(delay).await;
                Ok(UpstreamResponse { status, body })
            }
            Step::TransportError(reason) => Err(ConditionsError::Transport(reason)),
        }
    }
}

/// Cache backend that is down for reads, writes or both.
#[derive(Clone, Copy)]
pub struct BrokenCacheStore {
    pub fail_get: bool,
    pub fail_put: bool,
}

#[async_trait]
impl CacheStore for BrokenCacheStore {
    async fn get(&self, _key: &str) -> Result<Option<CachedValue>> {
        if self.fail_get {
            return Err(ConditionsError::Store("backend down".to_string()));
        }
        Ok(None)
    }

    async fn put(&self, _key: &str, _value: CachedValue) -> Result<()> {
        if self.fail_put {
            return Err(ConditionsError::Store("backend down".to_string()));
        }
        Ok(())
    }
}

/// Circuit backend that fails every operation.
#[derive(Clone, Copy, Default)]
pub struct BrokenCircuitStore;

#[async_trait]
impl CircuitStateStore for BrokenCircuitStore {
    async fn load(&self, _endpoint: &str) -> Result<CircuitRecord> {
        Err(ConditionsError::Store("circuit backend down".to_string()))
    }

    async fn compare_and_swap(
        &self,
        _endpoint: &str,
        _expected: &CircuitRecord,
        _new: CircuitRecord,
    ) -> Result<bool> {
        Err(ConditionsError::Store("circuit backend down".to_string()))
    }
}

/// Clock the test moves by hand.
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap())),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub fn brl(amount: i64) -> Money {
    Money::from_minor(amount, Currency::BRL)
}

pub fn line(sku: &str, quantity: u32, unit_price: i64) -> LineItem {
    LineItem {
        sku: sku.to_string(),
        quantity,
        unit_price: brl(unit_price),
    }
}

/// A BRL cart totalling 19.99.
pub fn sample_cart() -> CartSnapshot {
    CartSnapshot::new(
        Currency::BRL,
        vec![line("SKU-BOOK", 1, 1500), line("SKU-PEN", 1, 499)],
    )
    .unwrap()
}

/// Conditions for a 19.99 BRL cart in the purchase view.
pub fn conditions_body() -> String {
    json!({
        "currency": "BRL",
        "purchaseInstallments": [
            { "count": 1, "installmentAmount": "19.99", "totalAmount": "19.99" },
            { "count": 3, "installmentAmount": "6.66", "totalAmount": "19.99" },
            { "count": 6, "installmentAmount": "3.50", "totalAmount": "21.00", "interestRate": "0.0199" }
        ]
    })
    .to_string()
}

/// Wiring shared by the integration tests, with handles on every store.
pub struct Harness {
    pub service: PaymentConditionsService,
    pub upstream: ScriptedUpstream,
    pub breaker: Arc<CircuitBreaker>,
    pub cache_store: InMemoryCacheStore,
    pub clock: ManualClock,
}

pub fn breaker(clock: &ManualClock, config: CircuitBreakerConfig) -> Arc<CircuitBreaker> {
    let clock: ClockRef = Arc::new(clock.clone());
    Arc::new(CircuitBreaker::new(
        Box::new(InMemoryCircuitStore::new()),
        clock,
        config,
    ))
}

pub fn client(upstream: &ScriptedUpstream, breaker: Arc<CircuitBreaker>) -> ResilientClient {
    ResilientClient::new(Box::new(upstream.clone()), breaker, ClientConfig::default())
}

pub fn harness(upstream: ScriptedUpstream) -> Harness {
    harness_with(upstream, CircuitBreakerConfig::default())
}

pub fn harness_with(upstream: ScriptedUpstream, config: CircuitBreakerConfig) -> Harness {
    let clock = ManualClock::new();
    let clock_ref: ClockRef = Arc::new(clock.clone());
    let breaker = breaker(&clock, config);
    let cache_store = InMemoryCacheStore::new(clock_ref.clone());
    let service = PaymentConditionsService::new(
        ConditionsCache::new(Box::new(cache_store.clone()), clock_ref),
        client(&upstream, breaker.clone()),
        InstallmentNormalizer::new(),
        Duration::from_secs(300),
    );
    Harness {
        service,
        upstream,
        breaker,
        cache_store,
        clock,
    }
}

/// Service over caller-supplied stores, for backends that misbehave.
pub fn service_over(
    upstream: &ScriptedUpstream,
    cache_store: CacheStoreBox,
    circuit_store: CircuitStateStoreBox,
) -> PaymentConditionsService {
    let clock: ClockRef = Arc::new(ManualClock::new());
    let breaker = Arc::new(CircuitBreaker::new(
        circuit_store,
        clock.clone(),
        CircuitBreakerConfig::default(),
    ));
    PaymentConditionsService::new(
        ConditionsCache::new(cache_store, clock),
        client(upstream, breaker),
        InstallmentNormalizer::new(),
        Duration::from_secs(300),
    )
}
