use super::cache::ConditionsCache;
use super::client::{ClientRequest, ResilientClient};
use super::normalizer::InstallmentNormalizer;
use crate::domain::cart::CartSnapshot;
use crate::domain::installment::InstallmentPlan;
use crate::error::{ConditionsError, Result};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where an available plan came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanSource {
    Cache,
    Upstream,
}

/// Why the checkout has to proceed without installment conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnavailableReason {
    CircuitOpen,
    UpstreamUnavailable,
    UpstreamRejected { status: u16 },
    MalformedSchedule,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionsOutcome {
    Available {
        plan: InstallmentPlan,
        source: PlanSource,
    },
    Unavailable {
        reason: UnavailableReason,
    },
}

impl ConditionsOutcome {
    pub fn plan(&self) -> Option<&InstallmentPlan> {
        match self {
            ConditionsOutcome::Available { plan, .. } => Some(plan),
            ConditionsOutcome::Unavailable { .. } => None,
        }
    }
}

/// Entry point of the checkout flow into the conditions layer.
///
/// Looks the cart up in the cache, falls back to the upstream through the
/// resilient client, normalizes the answer and caches it. Infrastructure
/// failures and bad upstream payloads degrade to `Unavailable`; data errors
/// in the cart itself are returned as errors.
pub struct PaymentConditionsService {
    cache: ConditionsCache,
    client: ResilientClient,
    normalizer: InstallmentNormalizer,
    cache_ttl: Duration,
}

impl PaymentConditionsService {
    pub fn new(
        cache: ConditionsCache,
        client: ResilientClient,
        normalizer: InstallmentNormalizer,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            cache,
            client,
            normalizer,
            cache_ttl,
        }
    }

    pub fn client(&self) -> &ResilientClient {
        &self.client
    }

    pub async fn get(&self, cart: &CartSnapshot) -> Result<ConditionsOutcome> {
        let total = cart.total()?;
        let fingerprint = cart.fingerprint()?;

        match self.cache.get(&fingerprint).await {
            Ok(Some(plan)) => {
                debug!(%fingerprint, "conditions served from cache");
                return Ok(ConditionsOutcome::Available {
                    plan,
                    source: PlanSource::Cache,
                });
            }
            Ok(None) => {}
            Err(e) => warn!(%fingerprint, error = %e, "conditions cache read failed, treating as miss"),
        }

        let plan = match self.fetch_plan(cart).await {
            Ok(plan) => plan,
            Err(e) if e.is_fail_open() => {
                warn!(
                    %fingerprint,
                    endpoint = self.client.endpoint(),
                    error = %e,
                    "payment conditions unavailable, continuing without them"
                );
                return Ok(ConditionsOutcome::Unavailable {
                    reason: unavailable_reason(&e),
                });
            }
            Err(e) => return Err(e),
        };

        if let Err(e) = self.cache.put(&fingerprint, &plan, self.cache_ttl).await {
            warn!(%fingerprint, error = %e, "conditions cache write failed");
        }
        info!(
            %fingerprint,
            options = plan.len(),
            total = %total,
            "payment conditions fetched"
        );
        Ok(ConditionsOutcome::Available {
            plan,
            source: PlanSource::Upstream,
        })
    }

    async fn fetch_plan(&self, cart: &CartSnapshot) -> Result<InstallmentPlan> {
        let total = cart.total()?;
        let body = json!({
            "amount": total.to_decimal().to_string(),
            "currency": cart.currency(),
            "items": cart
                .items()
                .iter()
                .map(|item| json!({
                    "sku": item.sku,
                    "quantity": item.quantity,
                    "unit_price": item.unit_price.to_decimal().to_string(),
                }))
                .collect::<Vec<_>>(),
        });

        let response = self.client.call(ClientRequest::read(body)).await?;
        let raw = self.normalizer.parse(&response.body)?;
        self.normalizer.normalize(&raw, total)
    }
}

fn unavailable_reason(error: &ConditionsError) -> UnavailableReason {
    match error {
        ConditionsError::CircuitOpen { .. } => UnavailableReason::CircuitOpen,
        ConditionsError::UpstreamRejected { status, .. } => {
            UnavailableReason::UpstreamRejected { status: *status }
        }
        ConditionsError::MalformedSchedule(_) => UnavailableReason::MalformedSchedule,
        _ => UnavailableReason::UpstreamUnavailable,
    }
}
