//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (startup and reload):
//!     RouteDefinition[] from a RouteSource
//!     → registry.rs (predicate factories by name)
//!     → pattern.rs (compile path/host templates)
//!     → route.rs (Route + TargetTemplate)
//!     → table.rs (RouteTable, swapped into the RouteLocator)
//!
//! Incoming Request:
//!     → RouteLocator::snapshot()
//!     → matcher.rs (first route whose predicates all hold)
//!     → Return: RouteMatch or None
//! ```
//!
//! # Design Decisions
//! - Routes compiled once, immutable at runtime
//! - Declaration order decides; first match wins
//! - Malformed definitions fail the build, never a request

pub mod matcher;
pub mod pattern;
pub mod predicate;
pub mod registry;
pub mod route;
pub mod table;

pub use matcher::{find_route, RouteMatch};
pub use predicate::Predicate;
pub use registry::{PredicateFactory, PredicateRegistry};
pub use route::{Route, TargetTemplate};
pub use table::{FileRouteSource, RouteLocator, RouteSource, RouteTable, StaticRouteSource};
