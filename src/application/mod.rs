//! Application layer containing the resilient-call pipeline and the
//! orchestration of a conditions lookup.
//!
//! `PaymentConditionsService` is the entry point. It owns the cache and the
//! resilient client, both of which share process-wide state through injected
//! stores rather than globals.

pub mod cache;
pub mod circuit_breaker;
pub mod client;
pub mod idempotency;
pub mod normalizer;
pub mod retry;
pub mod service;
