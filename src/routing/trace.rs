//! Per-request stage trace.
//!
//! Records which pipeline stages a request passed through, in order, for
//! debugging stage priorities. Purely observational: the trace is logged
//! after dispatch and never consulted for routing decisions.

use std::fmt;

/// Marker the trace starts from.
pub const TRACE_SENTINEL: &str = "::trace::";

/// Accumulated trace of the stages one request has visited.
///
/// Lives inside the request context, so it is never shared across requests.
#[derive(Debug, Clone)]
pub struct StageTrace(String);

impl StageTrace {
    pub fn new() -> Self {
        Self(TRACE_SENTINEL.to_string())
    }

    /// Append a visited stage as `" => name (priority)"`.
    pub fn record(&mut self, name: &str, priority: i32) {
        self.0 = format!("{} => {} ({})", self.0, name, priority);
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for StageTrace {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StageTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
