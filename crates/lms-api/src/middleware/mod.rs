//! # Middleware
//!
//! - `metrics`: request and error counters, served at `/metrics`.
//! - `rate_limit`: fixed-window limiter keyed by caller.
//! - `tracing_layer`: `TraceLayer` with request spans.

pub mod metrics;
pub mod rate_limit;
pub mod tracing_layer;
