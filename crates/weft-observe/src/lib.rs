//! Observability for the Weft executor.

pub mod tracing_setup;
