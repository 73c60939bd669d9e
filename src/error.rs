use crate::domain::money::Currency;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConditionsError {
    #[error("Precision error: {value} has more than {scale} fractional digits for {currency}")]
    Precision {
        value: String,
        currency: Currency,
        scale: u32,
    },
    #[error("Currency mismatch: {left} vs {right}")]
    CurrencyMismatch { left: Currency, right: Currency },
    #[error("Malformed installment schedule: {0}")]
    MalformedSchedule(String),
    #[error("Circuit open for endpoint {endpoint}")]
    CircuitOpen { endpoint: String },
    #[error("Upstream {endpoint} unavailable after {attempts} attempt(s): {reason}")]
    UpstreamUnavailable {
        endpoint: String,
        attempts: u32,
        reason: String,
    },
    #[error("Upstream {endpoint} rejected the request with status {status}")]
    UpstreamRejected { endpoint: String, status: u16 },
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Store error: {0}")]
    Store(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ConditionsError {
    /// Errors the read path absorbs into an "unavailable" result instead of
    /// failing the checkout.
    pub fn is_fail_open(&self) -> bool {
        matches!(
            self,
            ConditionsError::CircuitOpen { .. }
                | ConditionsError::UpstreamUnavailable { .. }
                | ConditionsError::UpstreamRejected { .. }
                | ConditionsError::MalformedSchedule(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ConditionsError>;
