//! Filter subsystem.
//!
//! # Data Flow
//! ```text
//! global filters + route filters (declaration order)
//!     → chain.rs (cursor over the list)
//!     → request phase, top-down
//!     → url.rs resolves the outbound URL (if declared)
//!     → terminal forward (http::forward)
//!     → response phase, bottom-up
//! ```
//!
//! # Design Decisions
//! - Filters are trait objects so callers can register their own
//! - Declaration order is authoritative; nothing is sorted
//! - A route without `RouteToRequestUrl` is never forwarded

pub mod builtin;
pub mod chain;
pub mod registry;
pub mod url;

#[cfg(test)]
pub(crate) mod testing;

pub use chain::{Chain, GatewayFilter};
pub use registry::{FilterFactory, FilterRegistry};
pub use url::RouteToRequestUrl;
