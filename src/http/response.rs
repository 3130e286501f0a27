//! Mapping dispatch outcomes to client responses.
//!
//! # Design Decisions
//! - Backend responses are relayed as streams, never buffered
//! - No route is a plain `404`, not an error
//! - Forward failures become `502`, or `504` when the backend timed out
//! - Filter failures become `500`

use axum::body::Body;
use axum::http::{Response, StatusCode};
use axum::response::IntoResponse;

use crate::http::error::DispatchError;
use crate::http::handler::Dispatch;

/// Turn the result of `FilteringHandler::handle` into the response to send.
pub fn dispatch_response(outcome: Result<Dispatch, DispatchError>) -> Response<Body> {
    match outcome {
        Ok(Dispatch::Forwarded(response))
        | Ok(Dispatch::ShortCircuited(response))
        | Ok(Dispatch::NotForwarded(response)) => response,
        Ok(Dispatch::Unmatched) => (StatusCode::NOT_FOUND, "No matching route found").into_response(),
        Err(e) => {
            let status = e.status();
            let message = match status {
                StatusCode::GATEWAY_TIMEOUT => "Upstream request timed out",
                StatusCode::BAD_GATEWAY => "Upstream request failed",
                _ => "Gateway filter failed",
            };
            (status, message).into_response()
        }
    }
}
