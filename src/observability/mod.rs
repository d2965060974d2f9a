//! Observability subsystem.
//!
//! # Design Decisions
//! - Structured logging via `tracing`; the per-request stage trace is
//!   emitted at debug level after dispatch
//! - Metrics are cheap label-and-increment updates on the forward path
//! - The Prometheus exporter is optional and off by default

pub mod logging;
pub mod metrics;
