//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! gateway. All types derive Serde traits for deserialization from config
//! files.

use serde::{Deserialize, Serialize};

use crate::session::cookie::SESSION_MAX_AGE_SECS;

/// Root configuration for the tunnel gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, backpressure).
    pub listener: ListenerConfig,

    /// Public host of the gateway. An empty value disables the entire
    /// routing pipeline: every request passes straight to the router.
    pub host: String,

    /// Scheme clients reach the gateway over, reported downstream as
    /// X-Forwarded-Proto. TLS termination is an external concern.
    pub public_scheme: String,

    /// Session binding behavior.
    pub session: SessionConfig,

    /// Pipeline stage ordering.
    pub pipeline: PipelineConfig,

    /// Static tenant backends standing in for the tunnel transport.
    pub tenants: Vec<TenantConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8090").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8090".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Session binding configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Which binding variant runs. Historical deployments disagree; both
    /// are kept as explicit choices.
    pub variant: BindingVariant,

    /// Session cookie lifetime (default 30 days).
    pub cookie_max_age_secs: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            variant: BindingVariant::default(),
            cookie_max_age_secs: SESSION_MAX_AGE_SECS,
        }
    }
}

/// How tenant bindings relate to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BindingVariant {
    /// Per-browser-session binding via a signed-out-able cookie. Multiple
    /// tenants can be active concurrently for different sessions.
    #[default]
    SessionCookie,

    /// One process-wide binding, no cookie: the most recently resolved
    /// tenant wins for every client until it goes stale. Works for
    /// non-browser clients at the cost of session isolation.
    SingleShared,
}

/// Pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub priority_scheme: PriorityScheme,
}

/// Numbering convention for stage priorities. Either way the chain runs
/// ascending; only the numbers differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PriorityScheme {
    /// Small positive integers: 1, 2, 3, 4.
    #[default]
    Positive,

    /// Negative-based ascending: -4, -3, -2, -1.
    Negative,
}

impl PriorityScheme {
    /// Priorities for (proxy, upgrade, index, ingress), in that order.
    pub fn stage_priorities(self) -> [i32; 4] {
        match self {
            PriorityScheme::Positive => [1, 2, 3, 4],
            PriorityScheme::Negative => [-4, -3, -2, -1],
        }
    }
}

/// One static tenant backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TenantConfig {
    /// Tenant identifier, the leading path segment clients navigate to.
    pub name: String,

    /// Backend authority (e.g., "127.0.0.1:3000").
    pub address: String,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Whole-request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Whether to expose Prometheus metrics.
    pub metrics_enabled: bool,

    /// Metrics exporter bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9100".to_string(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            host: String::new(),
            public_scheme: "http".to_string(),
            session: SessionConfig::default(),
            pipeline: PipelineConfig::default(),
            tenants: Vec::new(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}
