use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Opaque token identifying one logical mutating operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(Uuid);

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Issues a fresh key per logical operation.
///
/// The issuer keeps no record of what it handed out. Callers retrying the same
/// business operation must hold on to the key they were given and send it
/// again rather than asking for a new one.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdempotencyKeyIssuer;

impl IdempotencyKeyIssuer {
    pub fn new() -> Self {
        Self
    }

    pub fn issue(&self) -> IdempotencyKey {
        IdempotencyKey(Uuid::new_v4())
    }
}
