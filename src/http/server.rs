//! HTTP server setup and pipeline dispatch.
//!
//! # Responsibilities
//! - Build the Axum router: one fallback handler feeding the pipeline
//! - Wire up middleware (timeout, request ID, tracing)
//! - Assemble the stage chain and the binding store at startup
//! - Append deferred cookies to whatever response ends a request
//! - Serve with graceful shutdown
//!
//! # Design Decisions
//! - Axum never routes by path here; the pipeline and the multiplexer own
//!   all routing, including CONNECT which path routers cannot address
//! - An unset gateway host disables the pipeline entirely (logged once);
//!   requests then pass through to the multiplexer untouched

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, State};
use axum::response::Response;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::GatewayConfig;
use crate::http::request::RequestIdLayer;
use crate::pipeline::{self, MiddlewareChain, RequestContext, StageOutcome};
use crate::proxy::{ProxyGate, ReverseProxyFactory};
use crate::routing::{HttpRequest, RequestMultiplexer, CONNECT_PATTERN};
use crate::session::TenantBindingStore;
use crate::transport::TunnelTransport;

/// Application state injected into the dispatch handler.
#[derive(Clone)]
struct AppState {
    /// None when the gateway host is unset: pipeline disabled.
    chain: Option<Arc<MiddlewareChain>>,
    mux: Arc<RequestMultiplexer>,
}

/// HTTP server hosting the routing pipeline.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
}

impl GatewayServer {
    /// Assemble the pipeline and build the router.
    ///
    /// The multiplexer passed in plays the hosting application's router:
    /// requests no stage claims land there. Its CONNECT slot is always
    /// bound to the proxy gate.
    pub fn new(
        config: GatewayConfig,
        transport: Arc<dyn TunnelTransport>,
        gate: Arc<dyn ProxyGate>,
        mut mux: RequestMultiplexer,
    ) -> Self {
        mux.handle(CONNECT_PATTERN, gate.handler());

        let chain = if config.host.is_empty() {
            tracing::warn!(
                "gateway host unset; routing pipeline disabled, all requests fall through"
            );
            None
        } else {
            let factory = ReverseProxyFactory::new(config.public_scheme.clone());
            let store = Arc::new(TenantBindingStore::new(
                transport.clone(),
                factory,
                config.session.variant,
                config.session.cookie_max_age_secs,
            ));
            let chain = pipeline::assemble(
                config.pipeline.priority_scheme,
                gate,
                transport,
                store,
            );
            tracing::info!(
                host = %config.host,
                variant = ?config.session.variant,
                stages = ?chain.stage_names(),
                "routing pipeline assembled"
            );
            Some(Arc::new(chain))
        };

        let state = AppState {
            chain,
            mux: Arc::new(mux),
        };

        // Request IDs are stamped outside the trace layer so the span the
        // request opens with already carries its ID.
        let router = Router::new()
            .fallback(dispatch)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(TraceLayer::new_for_http())
            .layer(RequestIdLayer);

        Self { router, config }
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "gateway server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = shutdown.recv() => {}
                    _ = ctrl_c() => {}
                }
                tracing::info!("shutdown signal received");
            })
            .await?;

        tracing::info!("gateway server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// The assembled router, for driving requests through in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

/// Single entry point for every request: pipeline first, multiplexer for
/// whatever falls through.
async fn dispatch(State(state): State<AppState>, req: HttpRequest) -> Response {
    let client_addr = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0);
    let mut cx = RequestContext::new(client_addr);

    let outcome = match &state.chain {
        Some(chain) => chain.dispatch(&mut cx, req).await,
        None => StageOutcome::Continue(req),
    };

    let mut resp = match outcome {
        StageOutcome::Handled(resp) => resp,
        StageOutcome::Continue(req) => state.mux.serve(req).await,
    };
    cx.apply_cookies(&mut resp);

    tracing::debug!(
        trace = %cx.trace,
        client = ?cx.client_addr,
        status = resp.status().as_u16(),
        "request dispatched"
    );
    resp
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
    }
}
