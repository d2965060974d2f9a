//! Config-driven stand-in for the tunnel transport layer.
//!
//! Maps tenant names to plain HTTP backend authorities and serves round
//! trips over a pooled hyper client. It implements just enough of
//! [`TunnelTransport`] to run the gateway binary and the end-to-end tests
//! against ordinary HTTP backends; the real relay replaces it in
//! production.

use std::str::FromStr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::uri::Authority;
use axum::http::{StatusCode, Uri};
use axum::response::IntoResponse;
use dashmap::DashMap;
use futures_util::future::BoxFuture;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;

use crate::config::schema::TenantConfig;
use crate::routing::{Handler, HttpRequest, HttpResponse};
use crate::transport::{
    host_name, request_host, RoundTripper, TransportError, TunnelTransport,
};

struct RegistryInner {
    /// Public host of the gateway, port ignored for comparison.
    host: String,
    tenants: DashMap<String, Authority>,
    client: Client<HttpConnector, Body>,
}

/// Static tenant registry backed by plain HTTP backends.
#[derive(Clone)]
pub struct StaticTenantRegistry {
    inner: Arc<RegistryInner>,
}

impl StaticTenantRegistry {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                host: host.into(),
                tenants: DashMap::new(),
                client: Client::builder(TokioExecutor::new()).build(HttpConnector::new()),
            }),
        }
    }

    /// Build a registry from validated config entries. Entries whose address
    /// fails to parse are skipped with a warning; validation normally
    /// rejects them before this point.
    pub fn from_config(host: &str, tenants: &[TenantConfig]) -> Self {
        let registry = Self::new(host);
        for tenant in tenants {
            match Authority::from_str(&tenant.address) {
                Ok(authority) => registry.register(&tenant.name, authority),
                Err(e) => tracing::warn!(
                    tenant = %tenant.name,
                    address = %tenant.address,
                    error = %e,
                    "skipping tenant with unparseable address"
                ),
            }
        }
        registry
    }

    /// Register (or re-register) a tenant backend.
    pub fn register(&self, tenant_id: &str, authority: Authority) {
        self.inner.tenants.insert(tenant_id.to_string(), authority);
    }

    /// Drop a tenant, simulating its backend disconnecting.
    pub fn deregister(&self, tenant_id: &str) {
        self.inner.tenants.remove(tenant_id);
    }
}

impl TunnelTransport for StaticTenantRegistry {
    fn is_upgrade_request(&self, _req: &HttpRequest) -> bool {
        // No tunnel protocol here; agents never register over upgrades.
        false
    }

    fn is_root_external(&self, req: &HttpRequest) -> bool {
        match request_host(req) {
            Some(host) => host_name(host).eq_ignore_ascii_case(host_name(&self.inner.host)),
            None => false,
        }
    }

    fn lookup(&self, tenant_id: &str) -> bool {
        self.inner.tenants.contains_key(tenant_id)
    }

    fn round_tripper(&self, tenant_id: &str) -> Option<Arc<dyn RoundTripper>> {
        let authority = self.inner.tenants.get(tenant_id)?.clone();
        Some(Arc::new(ClientRoundTripper {
            tenant: tenant_id.to_string(),
            authority,
            client: self.inner.client.clone(),
        }))
    }

    fn ingress(&self) -> Handler {
        // Tenants are addressable as <tenant>.<host>; anything else is
        // unknown to this registry.
        let registry = self.clone();
        Arc::new(move |req| {
            let registry = registry.clone();
            Box::pin(async move {
                let tenant = request_host(&req)
                    .map(host_name)
                    .and_then(|h| h.split('.').next())
                    .unwrap_or_default()
                    .to_string();
                match registry.round_tripper(&tenant) {
                    Some(rt) => match rt.round_trip(req).await {
                        Ok(resp) => resp,
                        Err(e) => {
                            tracing::warn!(tenant = %tenant, error = %e, "ingress exchange failed");
                            (StatusCode::BAD_GATEWAY, "upstream tunnel error").into_response()
                        }
                    },
                    None => (StatusCode::NOT_FOUND, "no such tenant").into_response(),
                }
            })
        })
    }

    fn upgrader(&self) -> Handler {
        Arc::new(|_req| {
            Box::pin(async {
                (
                    StatusCode::NOT_IMPLEMENTED,
                    "static registry accepts no tunnel handshakes",
                )
                    .into_response()
            })
        })
    }
}

/// Round-tripper dialing a fixed backend authority.
///
/// The request keeps its public-facing Host header; only the URI authority
/// is redirected at the backend so the client dials the right socket.
struct ClientRoundTripper {
    tenant: String,
    authority: Authority,
    client: Client<HttpConnector, Body>,
}

impl RoundTripper for ClientRoundTripper {
    fn round_trip(
        &self,
        req: HttpRequest,
    ) -> BoxFuture<'static, Result<HttpResponse, TransportError>> {
        let client = self.client.clone();
        let authority = self.authority.clone();
        let tenant = self.tenant.clone();
        Box::pin(async move {
            let (mut parts, body) = req.into_parts();
            let mut uri_parts = parts.uri.clone().into_parts();
            uri_parts.scheme = Some(axum::http::uri::Scheme::HTTP);
            uri_parts.authority = Some(authority);
            if uri_parts.path_and_query.is_none() {
                uri_parts.path_and_query =
                    Some(axum::http::uri::PathAndQuery::from_static("/"));
            }
            parts.uri = Uri::from_parts(uri_parts)
                .map_err(|e| TransportError::Exchange(Box::new(e)))?;

            let resp = client
                .request(axum::http::Request::from_parts(parts, body))
                .await
                .map_err(|e| {
                    if e.is_connect() {
                        TransportError::Unavailable(tenant.clone())
                    } else {
                        TransportError::Exchange(Box::new(e))
                    }
                })?;
            let (parts, body) = resp.into_parts();
            Ok(HttpResponse::from_parts(parts, Body::new(body)))
        })
    }
}
