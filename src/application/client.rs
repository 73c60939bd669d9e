use super::circuit_breaker::CircuitBreaker;
use super::idempotency::{IDEMPOTENCY_KEY_HEADER, IdempotencyKey};
use super::retry::{AttemptOutcome, RetryDecision, RetryPolicy, StopReason};
use crate::domain::ports::{ConditionsUpstreamBox, UpstreamRequest, UpstreamResponse};
use crate::error::{ConditionsError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

pub const CORRELATION_ID_HEADER: &str = "X-Correlation-Id";
pub const CONTENT_TYPE_HEADER: &str = "Content-Type";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Hard wall-clock budget of a single attempt.
    pub timeout_ms: u64,
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 2_000,
            retry: RetryPolicy::default(),
        }
    }
}

/// A logical call to the upstream, possibly spanning several attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientRequest {
    pub body: serde_json::Value,
    /// Present for mutating operations; sent unchanged on every attempt.
    pub idempotency_key: Option<IdempotencyKey>,
}

impl ClientRequest {
    pub fn read(body: serde_json::Value) -> Self {
        Self {
            body,
            idempotency_key: None,
        }
    }

    pub fn mutating(body: serde_json::Value, key: IdempotencyKey) -> Self {
        Self {
            body,
            idempotency_key: Some(key),
        }
    }
}

/// Wraps an upstream with circuit breaking, per-attempt timeouts and retries.
pub struct ResilientClient {
    upstream: ConditionsUpstreamBox,
    breaker: Arc<CircuitBreaker>,
    config: ClientConfig,
}

impl ResilientClient {
    pub fn new(
        upstream: ConditionsUpstreamBox,
        breaker: Arc<CircuitBreaker>,
        config: ClientConfig,
    ) -> Self {
        Self {
            upstream,
            breaker,
            config,
        }
    }

    pub fn endpoint(&self) -> &str {
        self.upstream.endpoint()
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Performs one logical call.
    ///
    /// Fails fast with `CircuitOpen` without touching the network when the
    /// breaker refuses. Otherwise retries per the policy and reports the final
    /// outcome to the breaker once.
    pub async fn call(&self, request: ClientRequest) -> Result<UpstreamResponse> {
        let endpoint = self.upstream.endpoint();
        match self.breaker.allow(endpoint).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(endpoint, "circuit open, skipping upstream call");
                return Err(ConditionsError::CircuitOpen {
                    endpoint: endpoint.to_string(),
                });
            }
            Err(e) => {
                warn!(endpoint, error = %e, "circuit state unreadable, calling upstream ungated");
            }
        }

        let correlation_id = Uuid::new_v4();
        let outbound = self.outbound(request, correlation_id);
        let mut retry = self.config.retry.start();

        loop {
            let delay = retry.next_delay();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let attempt = retry.attempt();
            let result = self.attempt(&outbound).await;
            let outcome = match &result {
                Ok(response) => AttemptOutcome::from_status(response.status),
                Err(_) => AttemptOutcome::Retryable,
            };

            match retry.record(outcome) {
                RetryDecision::RetryAfter(next_delay) => {
                    warn!(
                        endpoint,
                        %correlation_id,
                        attempt,
                        delay_ms = next_delay.as_millis() as u64,
                        reason = %describe(&result),
                        "upstream attempt failed, retrying"
                    );
                }
                RetryDecision::Stop(reason) => {
                    return self
                        .finish(reason, result, retry.attempts_made(), correlation_id)
                        .await;
                }
            }
        }
    }

    fn outbound(&self, request: ClientRequest, correlation_id: Uuid) -> UpstreamRequest {
        let mut headers = BTreeMap::new();
        headers.insert(
            CORRELATION_ID_HEADER.to_string(),
            correlation_id.to_string(),
        );
        headers.insert(
            CONTENT_TYPE_HEADER.to_string(),
            "application/json".to_string(),
        );
        if let Some(key) = request.idempotency_key {
            headers.insert(IDEMPOTENCY_KEY_HEADER.to_string(), key.to_string());
        }
        UpstreamRequest {
            body: request.body,
            headers,
        }
    }

    /// One bounded attempt. A late answer is dropped together with its future.
    async fn attempt(
        &self,
        request: &UpstreamRequest,
    ) -> std::result::Result<UpstreamResponse, String> {
        let timeout = Duration::from_millis(self.config.timeout_ms);
        match tokio::time::timeout(timeout, self.upstream.send(request)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!("timed out after {}ms", self.config.timeout_ms)),
        }
    }

    /// Breaker bookkeeping never changes the outcome of a call.
    async fn report_success(&self, endpoint: &str) {
        if let Err(e) = self.breaker.record_success(endpoint).await {
            warn!(endpoint, error = %e, "could not record success on circuit");
        }
    }

    async fn finish(
        &self,
        reason: StopReason,
        result: std::result::Result<UpstreamResponse, String>,
        attempts: u32,
        correlation_id: Uuid,
    ) -> Result<UpstreamResponse> {
        let endpoint = self.upstream.endpoint();
        match (reason, result) {
            (StopReason::Succeeded, Ok(response)) => {
                self.report_success(endpoint).await;
                debug!(endpoint, %correlation_id, attempts, "upstream call succeeded");
                Ok(response)
            }
            (StopReason::NonRetryable, Ok(response)) => {
                // The upstream answered; a rejection says nothing about its health.
                self.report_success(endpoint).await;
                warn!(
                    endpoint,
                    %correlation_id,
                    status = response.status,
                    "upstream rejected request"
                );
                Err(ConditionsError::UpstreamRejected {
                    endpoint: endpoint.to_string(),
                    status: response.status,
                })
            }
            (_, result) => {
                let reason = describe(&result);
                if let Err(e) = self.breaker.record_failure(endpoint).await {
                    warn!(endpoint, error = %e, "could not record failure on circuit");
                }
                warn!(
                    endpoint,
                    %correlation_id,
                    attempts,
                    reason = %reason,
                    "upstream retries exhausted"
                );
                Err(ConditionsError::UpstreamUnavailable {
                    endpoint: endpoint.to_string(),
                    attempts,
                    reason,
                })
            }
        }
    }
}

fn describe(result: &std::result::Result<UpstreamResponse, String>) -> String {
    match result {
        Ok(response) => format!("status {}", response.status),
        Err(reason) => reason.clone(),
    }
}
