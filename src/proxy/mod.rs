//! Reverse proxying subsystem.
//!
//! # Data Flow
//! ```text
//! Bound request
//!     → forward.rs (rewrite Host / scheme / X-Forwarded-*)
//!     → RoundTripper (tunnel transport, per tenant)
//!     → Response (or 502 when the transport is gone mid-flight)
//! ```

pub mod forward;
pub mod gate;

pub use forward::ReverseProxyFactory;
pub use gate::{DenyingProxyGate, ProxyGate};
