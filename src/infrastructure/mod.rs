//! Adapters for the domain ports: in-memory stores, the system clock and the
//! HTTP upstream.

pub mod clock;
pub mod http;
pub mod in_memory;
