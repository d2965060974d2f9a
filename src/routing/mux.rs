//! Method/path dispatch table with a first-class CONNECT slot.
//!
//! # Responsibilities
//! - Register handlers for (method, path pattern) pairs
//! - Dispatch requests by longest matching pattern
//! - Route CONNECT requests, which carry no URL path, via a reserved slot
//!
//! # Design Decisions
//! - Standard routers key exclusively on the path, which is empty for
//!   CONNECT; the reserved pattern `"CONNECT "` binds that method to a
//!   distinct slot so tunnel traffic and path-addressed traffic share one
//!   table without collision
//! - Patterns ending in `/` match by prefix, everything else matches exactly
//! - Registration happens once at startup; dispatch is read-only

use std::future::Future;
use std::sync::Arc;

use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;

use crate::routing::{Handler, HttpRequest, HttpResponse};

/// Reserved pattern binding a handler to the CONNECT method.
pub const CONNECT_PATTERN: &str = "CONNECT ";

struct Route {
    method: Option<Method>,
    pattern: String,
    handler: Handler,
}

impl Route {
    fn matches(&self, req: &HttpRequest) -> bool {
        if let Some(method) = &self.method {
            if req.method() != method {
                return false;
            }
        }
        let path = req.uri().path();
        if self.pattern.ends_with('/') {
            path.starts_with(self.pattern.as_str())
        } else {
            path == self.pattern
        }
    }
}

/// Dispatch table over (method, path pattern) pairs plus a CONNECT slot.
#[derive(Default)]
pub struct RequestMultiplexer {
    routes: Vec<Route>,
    connect: Option<Handler>,
}

impl RequestMultiplexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under a pattern.
    ///
    /// Patterns are either `"/path"` (optionally with a leading
    /// `"METHOD "` restricting the verb) or the reserved [`CONNECT_PATTERN`],
    /// which fills the CONNECT slot instead of the table. Re-registering a
    /// pattern shadows nothing; the longest match still wins at dispatch.
    pub fn handle(&mut self, pattern: &str, handler: Handler) {
        if pattern == CONNECT_PATTERN {
            self.connect = Some(handler);
            return;
        }
        let (method, pattern) = split_pattern(pattern);
        self.routes.push(Route {
            method,
            pattern,
            handler,
        });
    }

    /// Register a plain async function under a pattern.
    pub fn handle_fn<F, Fut>(&mut self, pattern: &str, f: F)
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HttpResponse> + Send + 'static,
    {
        self.handle(pattern, Arc::new(move |req| Box::pin(f(req))));
    }

    /// Resolve the handler for a request without serving it.
    ///
    /// A CONNECT request with an empty path always resolves to the CONNECT
    /// slot when one is registered, bypassing the pattern table entirely.
    /// Returns the handler together with the pattern that matched (empty
    /// for the CONNECT slot).
    pub fn handler(&self, req: &HttpRequest) -> Option<(Handler, &str)> {
        if req.method() == Method::CONNECT && req.uri().path().is_empty() {
            if let Some(h) = &self.connect {
                return Some((h.clone(), ""));
            }
        }
        self.routes
            .iter()
            .filter(|r| r.matches(req))
            .max_by_key(|r| r.pattern.len())
            .map(|r| (r.handler.clone(), r.pattern.as_str()))
    }

    /// Dispatch a request, answering 404 when nothing matches.
    pub async fn serve(&self, req: HttpRequest) -> HttpResponse {
        match self.handler(&req) {
            Some((handler, _)) => handler(req).await,
            None => (StatusCode::NOT_FOUND, "no matching route").into_response(),
        }
    }
}

fn split_pattern(pattern: &str) -> (Option<Method>, String) {
    match pattern.split_once(' ') {
        Some((method, path)) if !method.is_empty() && !method.starts_with('/') => (
            Method::from_bytes(method.as_bytes()).ok(),
            path.to_string(),
        ),
        _ => (None, pattern.to_string()),
    }
}
