//! Tenant binding store: the Unbound / Bound / Expired state machine.
//!
//! # Responsibilities
//! - Resolve a leading path segment to a live tenant and bind the session
//! - Serve bound sessions from the cached per-tenant proxy handler
//! - Invalidate bindings the moment their tenant stops being live
//!
//! # Design Decisions
//! - At most one cached handler per tenant; re-resolution replaces it
//! - A path naming a live tenant always wins over an existing binding,
//!   which is how a session switches tenants
//! - Cookie clears are deferred onto whatever response ends the request,
//!   so an expired binding can fall through and still drop its cookie

use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use std::sync::Arc;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::IntoResponse;

use crate::config::schema::BindingVariant;
use crate::pipeline::chain::{RequestContext, StageOutcome};
use crate::proxy::ReverseProxyFactory;
use crate::routing::{Handler, HttpRequest, HttpResponse};
use crate::session::cookie::{self, API_PIN_COOKIE, SESSION_COOKIE};
use crate::transport::TunnelTransport;

/// Shared store mapping tenants to their cached reverse-proxy handlers.
///
/// Safe for concurrent read/insert/replace; every read re-validates the
/// tenant against the transport registry before the handler is used.
pub struct TenantBindingStore {
    transport: Arc<dyn TunnelTransport>,
    factory: ReverseProxyFactory,
    proxies: DashMap<String, Handler>,
    variant: BindingVariant,
    cookie_max_age_secs: i64,
    /// Single-shared variant only: the process-wide active tenant.
    active: ArcSwapOption<String>,
}

impl TenantBindingStore {
    pub fn new(
        transport: Arc<dyn TunnelTransport>,
        factory: ReverseProxyFactory,
        variant: BindingVariant,
        cookie_max_age_secs: i64,
    ) -> Self {
        Self {
            transport,
            factory,
            proxies: DashMap::new(),
            variant,
            cookie_max_age_secs,
            active: ArcSwapOption::empty(),
        }
    }

    /// Run one request through the binding state machine.
    pub async fn route(&self, cx: &mut RequestContext, req: HttpRequest) -> StageOutcome {
        if !self.transport.is_root_external(&req) {
            return StageOutcome::Continue(req);
        }
        match self.variant {
            BindingVariant::SessionCookie => self.route_session(cx, req).await,
            BindingVariant::SingleShared => self.route_shared(req).await,
        }
    }

    async fn route_session(&self, cx: &mut RequestContext, req: HttpRequest) -> StageOutcome {
        let path = req.uri().path().to_string();
        let is_ui = path.starts_with("/_/");
        let is_api = path.starts_with("/api/");
        let ui_referer = req
            .headers()
            .get(header::REFERER)
            .and_then(|v| v.to_str().ok())
            .map(|r| r.ends_with("/_/"))
            .unwrap_or(false);

        // API calls issued from the hosting UI pass through to the hosting
        // router, unless the pin cookie keeps them on the bound tenant.
        if is_api && ui_referer && !cookie::has_cookie(&req, API_PIN_COOKIE) {
            return StageOutcome::Continue(req);
        }

        // Visiting the hosting UI resets the session.
        if is_ui {
            cx.push_cookie(cookie::clear_cookie());
            return StageOutcome::Continue(req);
        }

        // Path resolution first: a live tenant named by the leading segment
        // takes precedence over any existing binding.
        let lead = leading_component(&path);
        if !lead.is_empty() && self.bind(lead).is_some() {
            if let Some(c) = cookie::bind_cookie(lead, self.cookie_max_age_secs) {
                cx.push_cookie(c);
            }
            return StageOutcome::Handled(redirect_to_root());
        }

        if let Some(tenant) = cookie::cookie_value(&req, SESSION_COOKIE) {
            return match self.serve_bound(&tenant, req).await {
                Ok(resp) => StageOutcome::Handled(resp),
                Err(req) => {
                    cx.push_cookie(cookie::clear_cookie());
                    StageOutcome::Continue(req)
                }
            };
        }

        StageOutcome::Continue(req)
    }

    async fn route_shared(&self, req: HttpRequest) -> StageOutcome {
        let lead = leading_component(req.uri().path()).to_string();
        if !lead.is_empty() && self.bind(&lead).is_some() {
            self.active.store(Some(Arc::new(lead)));
            return StageOutcome::Handled(redirect_to_root());
        }

        if let Some(tenant) = self.active.load_full() {
            return match self.serve_bound(&tenant, req).await {
                Ok(resp) => StageOutcome::Handled(resp),
                Err(req) => {
                    self.active.store(None);
                    StageOutcome::Continue(req)
                }
            };
        }

        StageOutcome::Continue(req)
    }

    /// Build and cache the proxy handler for a live tenant. Replaces any
    /// previously cached handler for the same identifier.
    fn bind(&self, tenant_id: &str) -> Option<Handler> {
        let rt = self.transport.round_tripper(tenant_id)?;
        let handler = self.factory.build(tenant_id, rt);
        self.proxies.insert(tenant_id.to_string(), handler.clone());
        Some(handler)
    }

    /// Serve a request through the cached handler for a bound tenant.
    ///
    /// Gives the request back when the binding is stale (tenant no longer
    /// live, cached handler discarded) so the caller can fall through.
    async fn serve_bound(&self, tenant_id: &str, req: HttpRequest) -> Result<HttpResponse, HttpRequest> {
        if !self.transport.lookup(tenant_id) {
            self.proxies.remove(tenant_id);
            return Err(req);
        }
        let cached = self.proxies.get(tenant_id).map(|h| h.clone());
        let handler = match cached {
            Some(h) => h,
            // Cache miss for a live tenant (e.g. first request after a
            // restart): rebuild on the spot.
            None => match self.bind(tenant_id) {
                Some(h) => h,
                None => return Err(req),
            },
        };
        Ok(handler(req).await)
    }
}

fn leading_component(path: &str) -> &str {
    path.trim_start_matches('/')
        .split('/')
        .next()
        .unwrap_or_default()
}

fn redirect_to_root() -> HttpResponse {
    (
        StatusCode::FOUND,
        [(header::LOCATION, HeaderValue::from_static("/"))],
    )
        .into_response()
}
