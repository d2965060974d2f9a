//! Session cookie issuance, clearing, and parsing.
//!
//! The cookie binds one browser session to one tenant: HTTP-only, lax
//! same-site, path `/`. Clearing uses a negative max-age plus the epoch
//! expiry so every browser drops it immediately.

use axum::http::{header, HeaderValue};

use crate::routing::HttpRequest;

/// Cookie binding a browser session to a tenant identifier.
pub const SESSION_COOKIE: &str = "_indexSessionKey";

/// Auxiliary cookie: while present, `/api/`-prefixed requests stay pinned
/// to the bound tenant instead of passing through to the hosting router.
pub const API_PIN_COOKIE: &str = "_indexApiPin";

/// Default session duration: 30 days.
pub const SESSION_MAX_AGE_SECS: i64 = 2_592_000;

/// Set-Cookie value binding the session to `tenant_id`.
///
/// Returns `None` for values that cannot appear in a header; validated
/// tenant names never hit that case.
pub fn bind_cookie(tenant_id: &str, max_age_secs: i64) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={tenant_id}; Max-Age={max_age_secs}; Path=/; HttpOnly; SameSite=Lax"
    ))
    .ok()
}

/// Set-Cookie value clearing the session immediately.
pub fn clear_cookie() -> HeaderValue {
    HeaderValue::from_static(
        "_indexSessionKey=; Max-Age=-1; Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; SameSite=Lax",
    )
}

/// Read a cookie value off the request, treating empty values as absent.
pub fn cookie_value(req: &HttpRequest, name: &str) -> Option<String> {
    for header in req.headers().get_all(header::COOKIE) {
        let Ok(raw) = header.to_str() else { continue };
        for pair in raw.split(';') {
            if let Some((k, v)) = pair.trim().split_once('=') {
                if k == name && !v.is_empty() {
                    return Some(v.to_string());
                }
            }
        }
    }
    None
}

pub fn has_cookie(req: &HttpRequest, name: &str) -> bool {
    cookie_value(req, name).is_some()
}
