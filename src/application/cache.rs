use crate::domain::installment::InstallmentPlan;
use crate::domain::ports::{CacheStoreBox, CachedValue, ClockRef};
use crate::error::Result;
use std::time::Duration;
use tracing::warn;

/// Memoizes normalized plans per cart fingerprint for a bounded time.
///
/// Only successful lookups are ever written; failures are not cached.
pub struct ConditionsCache {
    store: CacheStoreBox,
    clock: ClockRef,
}

impl ConditionsCache {
    pub fn new(store: CacheStoreBox, clock: ClockRef) -> Self {
        Self { store, clock }
    }

    /// Returns the cached plan if one exists and has not expired.
    ///
    /// Entries that fail to decode are treated as misses.
    pub async fn get(&self, fingerprint: &str) -> Result<Option<InstallmentPlan>> {
        let Some(cached) = self.store.get(fingerprint).await? else {
            return Ok(None);
        };
        if cached.expires_at <= self.clock.now() {
            return Ok(None);
        }
        match serde_json::from_str(&cached.value) {
            Ok(plan) => Ok(Some(plan)),
            Err(e) => {
                warn!(fingerprint, error = %e, "discarding undecodable cache entry");
                Ok(None)
            }
        }
    }

    /// Stores `plan` under `fingerprint`, replacing whatever was there.
    pub async fn put(&self, fingerprint: &str, plan: &InstallmentPlan, ttl: Duration) -> Result<()> {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = self
            .clock
            .now()
            .checked_add_signed(ttl)
            .unwrap_or(chrono::DateTime::<chrono::Utc>::MAX_UTC);
        let value = serde_json::to_string(plan)?;
        self.store
            .put(fingerprint, CachedValue { value, expires_at })
            .await
    }
}
