//! Request-handling entry point.
//!
//! # Responsibilities
//! - Select a route from the current snapshot
//! - Bind the route and its captured variables to the exchange
//! - Build the per-request chain (global filters, then route filters) and
//!   drive it to completion
//! - Classify the outcome and record metrics
//!
//! # Design Decisions
//! - The snapshot loaded at match time is used for the whole request
//! - The forward is the only suspension point inside the chain
//! - Dropping the returned future cancels the outbound call and releases
//!   the exchange

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};

use crate::filter::{Chain, GatewayFilter};
use crate::http::error::DispatchError;
use crate::http::exchange::Exchange;
use crate::http::forward::Forwarder;
use crate::http::request::request_id;
use crate::http::response::dispatch_response;
use crate::observability::metrics;
use crate::routing::RouteLocator;

/// How a request ended when no error occurred.
#[derive(Debug)]
pub enum Dispatch {
    /// The backend answered; response-phase filters have run.
    Forwarded(Response<Body>),
    /// A filter answered without calling `proceed`.
    ShortCircuited(Response<Body>),
    /// The chain completed without a resolved request URL.
    NotForwarded(Response<Body>),
    /// No route accepted the request.
    Unmatched,
}

impl Dispatch {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Dispatch::Forwarded(_) => "forwarded",
            Dispatch::ShortCircuited(_) => "short_circuited",
            Dispatch::NotForwarded(_) => "not_forwarded",
            Dispatch::Unmatched => "unmatched",
        }
    }

    /// Status the client will receive.
    pub fn status(&self) -> StatusCode {
        match self {
            Dispatch::Forwarded(r) | Dispatch::ShortCircuited(r) | Dispatch::NotForwarded(r) => {
                r.status()
            }
            Dispatch::Unmatched => StatusCode::NOT_FOUND,
        }
    }
}

/// Matches requests and runs their filter chains.
#[derive(Clone)]
pub struct FilteringHandler {
    locator: Arc<RouteLocator>,
    global_filters: Arc<[Arc<dyn GatewayFilter>]>,
    forwarder: Arc<dyn Forwarder>,
}

impl FilteringHandler {
    pub fn new(
        locator: Arc<RouteLocator>,
        global_filters: Vec<Arc<dyn GatewayFilter>>,
        forwarder: Arc<dyn Forwarder>,
    ) -> Self {
        Self {
            locator,
            global_filters: global_filters.into(),
            forwarder,
        }
    }

    pub fn locator(&self) -> &Arc<RouteLocator> {
        &self.locator
    }

    pub fn global_filters(&self) -> &[Arc<dyn GatewayFilter>] {
        &self.global_filters
    }

    /// Dispatch one exchange.
    pub async fn handle(&self, mut exchange: Exchange) -> Result<Dispatch, DispatchError> {
        let start = Instant::now();
        let method = exchange.method().to_string();

        let table = self.locator.snapshot();
        let Some(found) = table.lookup(&exchange) else {
            tracing::debug!(method = %method, path = exchange.path(), "No route matched");
            metrics::record_unmatched(&method);
            metrics::record_request("none", &method, StatusCode::NOT_FOUND.as_u16(), start);
            return Ok(Dispatch::Unmatched);
        };
        drop(table);

        let route = found.route;
        exchange
            .attributes_mut()
            .bind_route(Arc::clone(&route), found.variables);

        let filters: Vec<Arc<dyn GatewayFilter>> = self
            .global_filters
            .iter()
            .chain(route.filters())
            .cloned()
            .collect();

        let result = Chain::new(route.id(), &filters, self.forwarder.as_ref())
            .proceed(&mut exchange)
            .await;

        if let Err(e) = result {
            if let DispatchError::Forward { source, .. } = &e {
                metrics::record_forward_failure(route.id(), source.cause());
            }
            metrics::record_request(route.id(), &method, e.status().as_u16(), start);
            return Err(e);
        }

        let response = exchange.take_response();
        let dispatch = if !exchange.chain_completed() {
            Dispatch::ShortCircuited(response)
        } else if exchange.forwarded() {
            Dispatch::Forwarded(response)
        } else {
            Dispatch::NotForwarded(response)
        };
        metrics::record_request(route.id(), &method, dispatch.status().as_u16(), start);
        Ok(dispatch)
    }

    /// Dispatch an HTTP request and map the outcome to a response.
    pub async fn handle_request(&self, request: Request<Body>) -> Response<Body> {
        let request_id = request_id(request.headers()).to_string();
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        tracing::debug!(request_id = %request_id, method = %method, path = %path, "Dispatching request");

        let outcome = self.handle(Exchange::new(request)).await;
        match &outcome {
            Ok(dispatch) => tracing::debug!(
                request_id = %request_id,
                outcome = dispatch.label(),
                status = dispatch.status().as_u16(),
                "Request completed"
            ),
            Err(e) => tracing::warn!(
                request_id = %request_id,
                path = %path,
                error = %e,
                "Request failed"
            ),
        }
        dispatch_response(outcome)
    }
}

impl std::fmt::Debug for FilteringHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilteringHandler")
            .field("locator", &self.locator)
            .field("global_filters", &self.global_filters.len())
            .finish()
    }
}
