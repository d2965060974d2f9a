//! Boundary to the authenticating CONNECT proxy.
//!
//! The proxy subsystem classifies and serves tunnel-proxy traffic on its
//! own; the pipeline only asks "is this yours?" and hands the request over
//! wholesale.

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;

use crate::routing::{Handler, HttpRequest};

/// The external proxy subsystem as consumed by the tunnel-proxy stage.
pub trait ProxyGate: Send + Sync {
    /// Whether the request is tunnel-proxy traffic this gate should own.
    fn is_proxy_request(&self, req: &HttpRequest) -> bool;

    /// The authenticating proxy handler itself.
    fn handler(&self) -> Handler;
}

/// Stand-in gate used when no authenticating proxy is wired in.
///
/// Recognizes CONNECT requests so they never leak into path routing, but
/// refuses to tunnel them.
#[derive(Default)]
pub struct DenyingProxyGate;

impl ProxyGate for DenyingProxyGate {
    fn is_proxy_request(&self, req: &HttpRequest) -> bool {
        req.method() == Method::CONNECT
    }

    fn handler(&self) -> Handler {
        Arc::new(|_req| {
            Box::pin(async {
                (
                    StatusCode::PROXY_AUTHENTICATION_REQUIRED,
                    "no proxy authenticator configured",
                )
                    .into_response()
            })
        })
    }
}
