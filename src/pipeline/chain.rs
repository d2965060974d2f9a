//! The stage chain and its dispatch loop.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::header::SET_COOKIE;
use axum::http::HeaderValue;
use futures_util::future::BoxFuture;

use crate::routing::{HttpRequest, HttpResponse, StageTrace};

/// What a stage decided about a request.
///
/// There is no implicit fallthrough: a stage either fully handles the
/// request or explicitly gives it back for the next stage.
pub enum StageOutcome {
    /// The stage served the response; the chain terminates.
    Handled(HttpResponse),
    /// The stage declined; the request moves to the next stage.
    Continue(HttpRequest),
}

/// Per-request state threaded through the chain.
///
/// Owns the stage trace and any deferred Set-Cookie values. Cookies pushed
/// here ride on whatever response ultimately terminates the request, which
/// lets a stage clear a cookie and still fall through.
pub struct RequestContext {
    pub trace: StageTrace,
    pub client_addr: Option<SocketAddr>,
    set_cookies: Vec<HeaderValue>,
}

impl RequestContext {
    pub fn new(client_addr: Option<SocketAddr>) -> Self {
        Self {
            trace: StageTrace::new(),
            client_addr,
            set_cookies: Vec::new(),
        }
    }

    /// Defer a Set-Cookie value onto the terminating response.
    pub fn push_cookie(&mut self, value: HeaderValue) {
        self.set_cookies.push(value);
    }

    /// Append the deferred cookies to the response that ends this request.
    pub fn apply_cookies(&self, resp: &mut HttpResponse) {
        for cookie in &self.set_cookies {
            resp.headers_mut().append(SET_COOKIE, cookie.clone());
        }
    }
}

/// One named, prioritized unit of the pipeline.
pub trait Stage: Send + Sync {
    /// Stable stage name, used in the trace and logs.
    fn name(&self) -> &'static str;

    /// Numeric priority; lower runs earlier.
    fn priority(&self) -> i32;

    fn handle<'a>(
        &'a self,
        cx: &'a mut RequestContext,
        req: HttpRequest,
    ) -> BoxFuture<'a, StageOutcome>;
}

/// Ordered sequence of stages. Built once at startup, immutable afterward.
#[derive(Default)]
pub struct MiddlewareChain {
    stages: Vec<Arc<dyn Stage>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stage. Stages are kept sorted ascending by priority; the
    /// sort is stable, so equal priorities keep registration order.
    pub fn bind(&mut self, stage: Arc<dyn Stage>) {
        self.stages.push(stage);
        self.stages.sort_by_key(|s| s.priority());
    }

    /// Stage names in dispatch order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run the request through the stages in priority order.
    ///
    /// Each stage records itself in the trace before acting. The first
    /// [`StageOutcome::Handled`] terminates the chain; exhausting all
    /// stages yields `Continue` with the request intact.
    pub async fn dispatch(&self, cx: &mut RequestContext, mut req: HttpRequest) -> StageOutcome {
        for stage in &self.stages {
            cx.trace.record(stage.name(), stage.priority());
            match stage.handle(cx, req).await {
                StageOutcome::Handled(resp) => return StageOutcome::Handled(resp),
                StageOutcome::Continue(next) => req = next,
            }
        }
        StageOutcome::Continue(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::IntoResponse;

    struct FixedStage {
        name: &'static str,
        priority: i32,
        handled: bool,
    }

    impl Stage for FixedStage {
        fn name(&self) -> &'static str {
            self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn handle<'a>(
            &'a self,
            _cx: &'a mut RequestContext,
            req: HttpRequest,
        ) -> BoxFuture<'a, StageOutcome> {
            Box::pin(async move {
                if self.handled {
                    StageOutcome::Handled((StatusCode::OK, self.name).into_response())
                } else {
                    StageOutcome::Continue(req)
                }
            })
        }
    }

    fn request() -> HttpRequest {
        Request::builder().uri("/").body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn runs_stages_ascending_by_priority() {
        let mut chain = MiddlewareChain::new();
        chain.bind(Arc::new(FixedStage { name: "late", priority: 9, handled: false }));
        chain.bind(Arc::new(FixedStage { name: "early", priority: 1, handled: false }));
        assert_eq!(chain.stage_names(), vec!["early", "late"]);

        let mut cx = RequestContext::new(None);
        let outcome = chain.dispatch(&mut cx, request()).await;
        assert!(matches!(outcome, StageOutcome::Continue(_)));
        assert_eq!(cx.trace.as_str(), "::trace:: => early (1) => late (9)");
    }

    #[test]
    fn equal_priorities_keep_registration_order() {
        let mut chain = MiddlewareChain::new();
        chain.bind(Arc::new(FixedStage { name: "first", priority: 3, handled: false }));
        chain.bind(Arc::new(FixedStage { name: "second", priority: 3, handled: false }));
        assert_eq!(chain.stage_names(), vec!["first", "second"]);
    }

    #[test]
    fn negative_scheme_still_sorts_ascending() {
        let mut chain = MiddlewareChain::new();
        chain.bind(Arc::new(FixedStage { name: "d", priority: -1, handled: false }));
        chain.bind(Arc::new(FixedStage { name: "a", priority: -4, handled: false }));
        chain.bind(Arc::new(FixedStage { name: "c", priority: -2, handled: false }));
        chain.bind(Arc::new(FixedStage { name: "b", priority: -3, handled: false }));
        assert_eq!(chain.stage_names(), vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn handled_short_circuits_later_stages() {
        let mut chain = MiddlewareChain::new();
        chain.bind(Arc::new(FixedStage { name: "stops", priority: 1, handled: true }));
        chain.bind(Arc::new(FixedStage { name: "never", priority: 2, handled: false }));

        let mut cx = RequestContext::new(None);
        let outcome = chain.dispatch(&mut cx, request()).await;
        let StageOutcome::Handled(resp) = outcome else {
            panic!("expected Handled");
        };
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(cx.trace.as_str(), "::trace:: => stops (1)");
    }

    #[tokio::test]
    async fn deferred_cookies_land_on_the_response() {
        let mut cx = RequestContext::new(None);
        cx.push_cookie(HeaderValue::from_static("a=1"));
        cx.push_cookie(HeaderValue::from_static("b=2"));
        let mut resp = (StatusCode::OK, "x").into_response();
        cx.apply_cookies(&mut resp);
        let cookies: Vec<_> = resp
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(cookies, vec!["a=1", "b=2"]);
    }
}
