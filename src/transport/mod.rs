//! Boundary to the tunnel transport layer.
//!
//! The gateway never speaks the tunnel protocol itself; it consumes the
//! transport through the narrow traits defined here. Production wires in the
//! real relay; the binary and the end-to-end tests use the config-driven
//! [`registry::StaticTenantRegistry`] stand-in.
//!
//! # Design Decisions
//! - Outbound transports are capabilities fetched per tenant on every use,
//!   never cached as a "live" flag; liveness is whatever `lookup` says now
//! - Trait objects rather than generics: the pipeline is assembled once at
//!   startup and dynamic dispatch keeps the stage types simple

pub mod registry;

use std::sync::Arc;

use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::routing::{Handler, HttpRequest, HttpResponse};

/// Errors surfaced by an outbound transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The tenant's connection is gone; nothing to exchange against.
    #[error("tenant backend unavailable: {0}")]
    Unavailable(String),

    /// The exchange itself failed mid-flight.
    #[error("upstream exchange failed: {0}")]
    Exchange(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// One round-trip HTTP exchange against a single tenant's connection.
///
/// Lifetime is tied to the tenant's live connection; once the tenant
/// disconnects the transport layer stops handing these out.
pub trait RoundTripper: Send + Sync {
    fn round_trip(
        &self,
        req: HttpRequest,
    ) -> BoxFuture<'static, Result<HttpResponse, TransportError>>;
}

/// The tunnel transport layer as consumed by the routing pipeline.
pub trait TunnelTransport: Send + Sync {
    /// Whether the request is a protocol-upgrade handshake the transport
    /// wants to take over (agent registration and the like).
    fn is_upgrade_request(&self, req: &HttpRequest) -> bool;

    /// Whether the request targets the gateway's own externally visible
    /// root, as opposed to a tenant-specific or internal surface.
    fn is_root_external(&self, req: &HttpRequest) -> bool;

    /// Whether a tenant identifier currently names a live backend.
    fn lookup(&self, tenant_id: &str) -> bool;

    /// Obtain the outbound transport for a live tenant, if any.
    fn round_tripper(&self, tenant_id: &str) -> Option<Arc<dyn RoundTripper>>;

    /// Generic ingress handler for everything that is not root-external.
    fn ingress(&self) -> Handler;

    /// Handler completing upgrade handshakes.
    fn upgrader(&self) -> Handler;
}

/// Extract the host a request was addressed to, preferring the Host header
/// over the URI authority (the latter is only present in absolute-form
/// requests).
pub fn request_host(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(axum::http::header::HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| req.uri().authority().map(|a| a.as_str()))
}

/// Strip an optional port from a host value.
pub fn host_name(host: &str) -> &str {
    match host.rsplit_once(':') {
        // Bracketed IPv6 literals keep their brackets, ports come after.
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;

    #[test]
    fn host_header_wins_over_authority() {
        let req: HttpRequest = Request::builder()
            .uri("http://internal:9999/x")
            .header("host", "public.example")
            .body(Body::empty())
            .unwrap();
        assert_eq!(request_host(&req), Some("public.example"));
    }

    #[test]
    fn host_name_strips_port() {
        assert_eq!(host_name("example.com:8080"), "example.com");
        assert_eq!(host_name("example.com"), "example.com");
        assert_eq!(host_name("[::1]:8080"), "[::1]");
    }
}
