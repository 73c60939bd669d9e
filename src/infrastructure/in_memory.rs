use crate::domain::circuit::CircuitRecord;
use crate::domain::ports::{CacheStore, CachedValue, CircuitStateStore, ClockRef};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory cache substrate.
///
/// Uses `Arc<RwLock<HashMap<String, CachedValue>>>` so clones share entries.
/// An expired entry is dropped when it is read, and every write sweeps out
/// all entries that have expired so far.
#[derive(Clone)]
pub struct InMemoryCacheStore {
    entries: Arc<RwLock<HashMap<String, CachedValue>>>,
    clock: ClockRef,
}

impl InMemoryCacheStore {
    pub fn new(clock: ClockRef) -> Self {
        Self {
            entries: Arc::default(),
            clock,
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<CachedValue>> {
        let now = self.clock.now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if entry.expires_at > now => return Ok(Some(entry.clone())),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        // Re-checked under the write lock: a fresh put may have landed meanwhile.
        if entries.get(key).is_some_and(|e| e.expires_at <= now) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn put(&self, key: &str, value: CachedValue) -> Result<()> {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// A thread-safe in-memory store for per-endpoint circuit records.
///
/// The write lock makes `compare_and_swap` atomic per process.
#[derive(Default, Clone)]
pub struct InMemoryCircuitStore {
    records: Arc<RwLock<HashMap<String, CircuitRecord>>>,
}

impl InMemoryCircuitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CircuitStateStore for InMemoryCircuitStore {
    async fn load(&self, endpoint: &str) -> Result<CircuitRecord> {
        let records = self.records.read().await;
        Ok(records.get(endpoint).cloned().unwrap_or_default())
    }

    async fn compare_and_swap(
        &self,
        endpoint: &str,
        expected: &CircuitRecord,
        new: CircuitRecord,
    ) -> Result<bool> {
        let mut records = self.records.write().await;
        let current = records.entry(endpoint.to_string()).or_default();
        if *current != *expected {
            return Ok(false);
        }
        *current = new;
        Ok(true)
    }
}
