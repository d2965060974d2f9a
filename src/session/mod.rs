//! Session binding subsystem.
//!
//! # Data Flow
//! ```text
//! Root-external request
//!     → store.rs (Unbound / Bound / Expired state machine)
//!     → cookie.rs (issue or clear the session cookie)
//!     → proxy handler (cached per tenant) or fall through
//! ```
//!
//! # Design Decisions
//! - The tenant→handler cache is an explicit injected store with a
//!   concurrent map, not ambient module state
//! - Liveness is re-checked against the transport registry on every use;
//!   a cached handler is never trusted to still be live
//! - Two deployment variants (per-session cookie vs. one shared binding)
//!   are configuration choices, never merged

pub mod cookie;
pub mod store;

pub use store::TenantBindingStore;
