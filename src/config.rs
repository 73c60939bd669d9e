use crate::application::circuit_breaker::CircuitBreakerConfig;
use crate::application::client::ClientConfig;
use crate::application::normalizer::DEFAULT_MAX_INSTALLMENTS;
use crate::error::{ConditionsError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Runtime settings for the conditions service.
///
/// Every field has a default, so a config file only needs the keys it wants
/// to change. Command-line flags are applied on top of the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub endpoint: Option<String>,
    pub client: ClientConfig,
    pub breaker: CircuitBreakerConfig,
    pub cache_ttl_secs: u64,
    /// Upstream options with more installments than this are rejected.
    pub max_installments: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            client: ClientConfig::default(),
            breaker: CircuitBreakerConfig::default(),
            cache_ttl_secs: 300,
            max_installments: DEFAULT_MAX_INSTALLMENTS,
        }
    }
}

impl ServiceConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn require_endpoint(&self) -> Result<&str> {
        match self.endpoint.as_deref().map(str::trim) {
            Some(endpoint) if !endpoint.is_empty() => Ok(endpoint),
            _ => Err(ConditionsError::ValidationError(
                "no conditions endpoint configured".to_string(),
            )),
        }
    }
}
