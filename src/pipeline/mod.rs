//! Priority-ordered middleware pipeline.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → chain.rs (stages in ascending priority order)
//!         1. proxy:   CONNECT/tunnel-proxy traffic → proxy gate
//!         2. upgrade: transport handshakes → upgrade handler
//!         3. index:   tenant session routing (bind / serve / expire)
//!         4. ingress: non-root-external traffic → transport ingress
//!     → Continue falls through to the hosting multiplexer
//! ```
//!
//! # Design Decisions
//! - Every stage returns an explicit {Handled, Continue}; the dispatch loop
//!   is the single place that decides whether to proceed
//! - Stage order is fixed at assembly time; ties keep registration order

pub mod chain;
pub mod stages;

use std::sync::Arc;

use crate::config::schema::PriorityScheme;
use crate::proxy::ProxyGate;
use crate::session::TenantBindingStore;
use crate::transport::TunnelTransport;

pub use chain::{MiddlewareChain, RequestContext, Stage, StageOutcome};

/// Assemble the four standard stages under the configured priority scheme.
pub fn assemble(
    scheme: PriorityScheme,
    gate: Arc<dyn ProxyGate>,
    transport: Arc<dyn TunnelTransport>,
    store: Arc<TenantBindingStore>,
) -> MiddlewareChain {
    let [p_proxy, p_upgrade, p_index, p_ingress] = scheme.stage_priorities();
    let mut chain = MiddlewareChain::new();
    chain.bind(Arc::new(stages::TunnelProxyStage::new(gate, p_proxy)));
    chain.bind(Arc::new(stages::UpgradeStage::new(
        transport.clone(),
        p_upgrade,
    )));
    chain.bind(Arc::new(stages::TenantSessionStage::new(store, p_index)));
    chain.bind(Arc::new(stages::IngressFallbackStage::new(
        transport, p_ingress,
    )));
    chain
}
