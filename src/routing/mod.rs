//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path, headers)
//!     → pipeline (prioritized stages, may short-circuit)
//!     → mux.rs (method/path dispatch table, CONNECT slot)
//!     → Return: handler or 404
//! ```
//!
//! # Design Decisions
//! - CONNECT carries no URL path, so it gets a dedicated slot in the
//!   multiplexer instead of an entry in the pattern table
//! - Longest pattern wins; no regex in the hot path
//! - The per-request stage trace is observational only and never gates
//!   behavior

pub mod mux;
pub mod trace;

use std::sync::Arc;

use axum::body::Body;
use axum::response::Response;
use futures_util::future::BoxFuture;

pub use mux::{RequestMultiplexer, CONNECT_PATTERN};
pub use trace::{StageTrace, TRACE_SENTINEL};

/// Inbound request type used throughout the pipeline.
pub type HttpRequest = axum::http::Request<Body>;

/// Response type produced by handlers and stages.
pub type HttpResponse = Response;

/// A shareable async HTTP handler. Stages, the multiplexer, and the
/// transport boundary all trade in this type.
pub type Handler = Arc<dyn Fn(HttpRequest) -> BoxFuture<'static, HttpResponse> + Send + Sync>;
