//! Domain layer: value types and the ports the application layer depends on.

pub mod cart;
pub mod circuit;
pub mod installment;
pub mod money;
pub mod ports;
