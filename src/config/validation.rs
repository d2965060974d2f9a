//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check tenant names are unique and routable as path segments
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use axum::http::uri::Authority;

use crate::config::schema::GatewayConfig;

/// One semantic problem found in a config.
#[derive(Debug)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every problem.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            "not a valid socket address",
        ));
    }

    if config.host.contains('/') {
        errors.push(ValidationError::new(
            "host",
            "must be a bare host, not a URL",
        ));
    }

    if config.public_scheme != "http" && config.public_scheme != "https" {
        errors.push(ValidationError::new(
            "public_scheme",
            "must be \"http\" or \"https\"",
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }

    if config.session.cookie_max_age_secs <= 0 {
        errors.push(ValidationError::new(
            "session.cookie_max_age_secs",
            "must be > 0",
        ));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "not a valid socket address",
        ));
    }

    let mut seen = HashSet::new();
    for (i, tenant) in config.tenants.iter().enumerate() {
        let field = format!("tenants[{i}]");
        if !valid_tenant_name(&tenant.name) {
            errors.push(ValidationError::new(
                format!("{field}.name"),
                "must be alphanumeric/'-'/'_', non-empty, not start with '_', and not be \"api\"",
            ));
        }
        if !seen.insert(tenant.name.clone()) {
            errors.push(ValidationError::new(
                format!("{field}.name"),
                format!("duplicate tenant name {:?}", tenant.name),
            ));
        }
        if Authority::from_str(&tenant.address).is_err() {
            errors.push(ValidationError::new(
                format!("{field}.address"),
                "not a valid authority",
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Tenant names become leading path segments and cookie values, so they
/// must stay clear of the reserved `/_/` and `/api/` surfaces.
fn valid_tenant_name(name: &str) -> bool {
    !name.is_empty()
        && name != "api"
        && !name.starts_with('_')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
