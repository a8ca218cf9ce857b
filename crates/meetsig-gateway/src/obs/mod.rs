//! Lightweight in-process metrics (dependency-free).
//!
//! Counters and gauges are plain atomics keyed by label sets and rendered in
//! Prometheus text format by the `/metrics` handler.

pub mod metrics;

pub use metrics::RelayMetrics;
