//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, tracing)
//!     → handler.rs (route lookup, chain assembly)
//!     → exchange.rs (per-request state the filters mutate)
//!     → forward.rs (outbound call to the resolved target)
//!     → response.rs (outcome → client response)
//!     → Send to client
//! ```

pub mod error;
pub mod exchange;
pub mod forward;
pub mod handler;
pub mod request;
pub mod response;
pub mod server;

pub use error::DispatchError;
pub use exchange::{empty_response, Attributes, Exchange, OriginalRequest, UriVariables};
pub use forward::{ForwardError, Forwarder, HttpForwarder};
pub use handler::{Dispatch, FilteringHandler};
pub use request::{request_id, UuidRequestId, X_REQUEST_ID};
pub use response::dispatch_response;
pub use server::HttpServer;
