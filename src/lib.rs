//! Session-bound, priority-ordered HTTP routing pipeline for a
//! multi-tenant reverse-tunnel gateway.
//!
//! Inbound requests run through a chain of prioritized stages (tunnel
//! proxying, protocol upgrades, tenant session routing, ingress fallback),
//! each of which may fully handle the request or explicitly pass it on.
//! Whatever falls through lands on a request multiplexer extended to route
//! the CONNECT method, which path-keyed routers cannot address.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pipeline;
pub mod proxy;
pub mod routing;
pub mod session;
pub mod transport;

pub use config::schema::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
