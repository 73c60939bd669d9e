use super::circuit::CircuitRecord;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A cached value and the instant after which it must not be served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedValue {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

/// Storage substrate for the conditions cache: get and put-with-expiry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CachedValue>>;
    async fn put(&self, key: &str, value: CachedValue) -> Result<()>;
}

/// Storage substrate for circuit breaker state.
///
/// `compare_and_swap` replaces the record only if the stored one still equals
/// `expected` and reports whether it did.
#[async_trait]
pub trait CircuitStateStore: Send + Sync {
    async fn load(&self, endpoint: &str) -> Result<CircuitRecord>;
    async fn compare_and_swap(
        &self,
        endpoint: &str,
        expected: &CircuitRecord,
        new: CircuitRecord,
    ) -> Result<bool>;
}

/// Outbound request to the authorization service.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamRequest {
    pub body: serde_json::Value,
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: String,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A single attempt against the authorization service.
///
/// Implementations perform exactly one network exchange; retries, timeouts
/// and circuit breaking are layered on top by `ResilientClient`.
#[async_trait]
pub trait ConditionsUpstream: Send + Sync {
    /// Identity the circuit breaker tracks this upstream under.
    fn endpoint(&self) -> &str;

    /// Returns `Err` only for transport-level failures. HTTP error statuses
    /// come back as a response.
    async fn send(&self, request: &UpstreamRequest) -> Result<UpstreamResponse>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub type CacheStoreBox = Box<dyn CacheStore>;
pub type CircuitStateStoreBox = Box<dyn CircuitStateStore>;
pub type ConditionsUpstreamBox = Box<dyn ConditionsUpstream>;
pub type ClockRef = Arc<dyn Clock>;
