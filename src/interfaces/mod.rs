//! Input and output adapters used by the command-line entry point.

pub mod csv;
