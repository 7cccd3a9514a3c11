//! Storage layer for the shift scheduler.
//! - `storage`: validated key namespace and the per-key JSON document store.
//! - `metrics`: Prometheus counters recorded by the store.
//! - `errors`: error types returned to the HTTP layer.

pub mod errors;
pub mod metrics;
pub mod storage;
