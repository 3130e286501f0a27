//! Edge request-dispatch gateway library.
//!
//! Matches inbound HTTP requests against an ordered set of routes built from
//! named predicates, runs each matched request through an onion-style filter
//! chain and forwards it to the route's resolved target.

pub mod admin;
pub mod config;
pub mod filter;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::GatewayConfig;
pub use http::{Dispatch, DispatchError, Exchange, FilteringHandler, HttpServer};
pub use lifecycle::{Gateway, Shutdown};
