//! Header-rewriting reverse-proxy handlers.
//!
//! # Responsibilities
//! - Append the client IP chain (X-Forwarded-For/Host/Proto)
//! - Preserve the public-facing Host on the outbound leg
//! - Force the plaintext internal scheme toward the backend
//! - Log and meter every forwarded exchange
//!
//! # Design Decisions
//! - A transport error mid-flight becomes a 502 to the client and is not
//!   retried here; retry policy belongs to the transport layer
//! - The built handler owns its round-tripper, so a handler outliving its
//!   tenant fails the exchange instead of panicking; callers re-validate
//!   liveness before invoking it anyway

use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::ConnectInfo;
use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::{header, HeaderValue, StatusCode, Uri};
use axum::response::IntoResponse;
use std::net::SocketAddr;

use crate::observability::metrics;
use crate::routing::{Handler, HttpRequest};
use crate::transport::{request_host, RoundTripper};

/// Builds forwarding handlers bound to one tenant's outbound transport.
pub struct ReverseProxyFactory {
    /// Scheme clients reach the gateway over, reported as
    /// X-Forwarded-Proto. TLS termination happens outside this crate.
    public_scheme: String,
}

impl ReverseProxyFactory {
    pub fn new(public_scheme: impl Into<String>) -> Self {
        Self {
            public_scheme: public_scheme.into(),
        }
    }

    /// Build the forwarding handler for one tenant.
    pub fn build(&self, tenant_id: &str, round_tripper: Arc<dyn RoundTripper>) -> Handler {
        let scheme = self.public_scheme.clone();
        let tenant = tenant_id.to_string();
        Arc::new(move |req: HttpRequest| {
            let rt = round_tripper.clone();
            let scheme = scheme.clone();
            let tenant = tenant.clone();
            Box::pin(async move {
                let start = Instant::now();
                let method = req.method().clone();
                let path = req
                    .uri()
                    .path_and_query()
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "/".to_string());

                let outbound = rewrite_outbound(req, &scheme);
                match rt.round_trip(outbound).await {
                    Ok(resp) => {
                        let status = resp.status();
                        tracing::info!(
                            tenant = %tenant,
                            method = %method,
                            path = %path,
                            status = status.as_u16(),
                            latency_ms = start.elapsed().as_millis() as u64,
                            "forwarded"
                        );
                        metrics::record_forward(method.as_str(), status.as_u16(), &tenant, start);
                        resp
                    }
                    Err(e) => {
                        tracing::warn!(
                            tenant = %tenant,
                            method = %method,
                            path = %path,
                            error = %e,
                            "upstream exchange failed"
                        );
                        metrics::record_forward(method.as_str(), 502, &tenant, start);
                        (StatusCode::BAD_GATEWAY, "upstream tunnel error").into_response()
                    }
                }
            })
        })
    }
}

/// Rewrite an inbound request for the backend leg: forwarding headers
/// appended, Host preserved from the inbound side, scheme forced to the
/// plaintext internal one.
fn rewrite_outbound(req: HttpRequest, public_scheme: &str) -> HttpRequest {
    let host = request_host(&req).unwrap_or_default().to_string();
    let client_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip());

    let (mut parts, body) = req.into_parts();

    if let Some(ip) = client_ip {
        let chain = match parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
        {
            Some(prev) => format!("{prev}, {ip}"),
            None => ip.to_string(),
        };
        if let Ok(v) = HeaderValue::from_str(&chain) {
            parts.headers.insert("x-forwarded-for", v);
        }
    }
    if !host.is_empty() {
        if let Ok(v) = HeaderValue::from_str(&host) {
            parts.headers.insert("x-forwarded-host", v.clone());
            parts.headers.insert(header::HOST, v);
        }
    }
    if let Ok(v) = HeaderValue::from_str(public_scheme) {
        parts.headers.insert("x-forwarded-proto", v);
    }

    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    if let Ok(authority) = Authority::from_str(&host) {
        uri_parts.authority = Some(authority);
    }
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    if let Ok(uri) = Uri::from_parts(uri_parts) {
        parts.uri = uri;
    }

    axum::http::Request::from_parts(parts, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;

    fn inbound(host: &str, path: &str) -> HttpRequest {
        let mut req = Request::builder()
            .uri(path)
            .header("host", host)
            .body(Body::empty())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo::<SocketAddr>("10.0.0.9:55000".parse().unwrap()));
        req
    }

    #[test]
    fn appends_forwarding_headers() {
        let out = rewrite_outbound(inbound("gw.example", "/page"), "https");
        assert_eq!(out.headers()["x-forwarded-for"], "10.0.0.9");
        assert_eq!(out.headers()["x-forwarded-host"], "gw.example");
        assert_eq!(out.headers()["x-forwarded-proto"], "https");
    }

    #[test]
    fn extends_existing_forwarded_chain() {
        let mut req = inbound("gw.example", "/");
        req.headers_mut()
            .insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7"));
        let out = rewrite_outbound(req, "http");
        assert_eq!(out.headers()["x-forwarded-for"], "203.0.113.7, 10.0.0.9");
    }

    #[test]
    fn outbound_keeps_public_host_and_plain_scheme() {
        let out = rewrite_outbound(inbound("gw.example:8080", "/a/b?x=1"), "https");
        assert_eq!(out.uri().scheme_str(), Some("http"));
        assert_eq!(out.uri().authority().map(|a| a.as_str()), Some("gw.example:8080"));
        assert_eq!(out.uri().path_and_query().map(|p| p.as_str()), Some("/a/b?x=1"));
        assert_eq!(out.headers()[header::HOST], "gw.example:8080");
    }
}
