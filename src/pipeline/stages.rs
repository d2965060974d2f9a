//! The four standard pipeline stages.
//!
//! Each stage recognizes one shape of request and hands it wholesale to the
//! owning subsystem, or gives it back untouched. Classification logic lives
//! with the collaborators (proxy gate, tunnel transport, binding store);
//! the stages only sequence them.

use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::pipeline::chain::{RequestContext, Stage, StageOutcome};
use crate::proxy::ProxyGate;
use crate::routing::HttpRequest;
use crate::session::TenantBindingStore;
use crate::transport::TunnelTransport;

/// Stage 1: CONNECT/tunnel-proxy traffic goes to the authenticating proxy.
pub struct TunnelProxyStage {
    gate: Arc<dyn ProxyGate>,
    priority: i32,
}

impl TunnelProxyStage {
    pub fn new(gate: Arc<dyn ProxyGate>, priority: i32) -> Self {
        Self { gate, priority }
    }
}

impl Stage for TunnelProxyStage {
    fn name(&self) -> &'static str {
        "proxy"
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
            if !self.gate.is_proxy_request(&req) {
                return StageOutcome::Continue(req);
            }
            let handler = self.gate.handler();
            StageOutcome::Handled(handler(req).await)
        })
    }
}

/// Stage 2: protocol-upgrade handshakes go to the transport layer.
pub struct UpgradeStage {
    transport: Arc<dyn TunnelTransport>,
    priority: i32,
}

impl UpgradeStage {
    pub fn new(transport: Arc<dyn TunnelTransport>, priority: i32) -> Self {
        Self { transport, priority }
    }
}

impl Stage for UpgradeStage {
    fn name(&self) -> &'static str {
        "upgrade"
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
            if !self.transport.is_upgrade_request(&req) {
                return StageOutcome::Continue(req);
            }
            let handler = self.transport.upgrader();
            StageOutcome::Handled(handler(req).await)
        })
    }
}

/// Stage 3: tenant session routing (bind, serve bound, expire).
pub struct TenantSessionStage {
    store: Arc<TenantBindingStore>,
    priority: i32,
}

impl TenantSessionStage {
    pub fn new(store: Arc<TenantBindingStore>, priority: i32) -> Self {
        Self { store, priority }
    }
}

impl Stage for TenantSessionStage {
    fn name(&self) -> &'static str {
        "index"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn handle<'a>(
        &'a self,
        cx: &'a mut RequestContext,
        req: HttpRequest,
    ) -> BoxFuture<'a, StageOutcome> {
        Box::pin(self.store.route(cx, req))
    }
}

/// Stage 4: anything not targeting the gateway's own root surface goes to
/// the transport's generic ingress handler.
pub struct IngressFallbackStage {
    transport: Arc<dyn TunnelTransport>,
    priority: i32,
}

impl IngressFallbackStage {
    pub fn new(transport: Arc<dyn TunnelTransport>, priority: i32) -> Self {
        Self { transport, priority }
    }
}

impl Stage for IngressFallbackStage {
    fn name(&self) -> &'static str {
        "ingress"
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
            if self.transport.is_root_external(&req) {
                return StageOutcome::Continue(req);
            }
            let handler = self.transport.ingress();
            StageOutcome::Handled(handler(req).await)
        })
    }
}
