//! Filter chain execution.
//!
//! # Responsibilities
//! - Define the filter contract (request phase, proceed, response phase)
//! - Walk the filter list with a cursor, forwarding at the end
//!
//! # Design Decisions
//! - Onion model: code before `proceed` runs top-down, code after it runs
//!   bottom-up as control unwinds
//! - A filter that returns without calling `proceed` short-circuits the rest
//!   of the chain, including the forward
//! - `proceed` consumes the cursor, so a filter can forward at most once

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::http::{empty_response, DispatchError, Exchange, ForwardError, Forwarder};

/// A request/response transformation step.
#[async_trait]
pub trait GatewayFilter: Send + Sync + fmt::Debug {
    /// Name used in logs and error reports.
    fn name(&self) -> &str;

    /// Apply this filter. Call `chain.proceed(exchange)` to continue; skip it
    /// to answer the request directly.
    async fn filter(&self, exchange: &mut Exchange, chain: Chain<'_>) -> Result<(), DispatchError>;
}

/// The remaining filters of one request plus the terminal forward.
pub struct Chain<'a> {
    route: &'a str,
    filters: &'a [Arc<dyn GatewayFilter>],
    forwarder: &'a dyn Forwarder,
}

impl<'a> Chain<'a> {
    pub fn new(
        route: &'a str,
        filters: &'a [Arc<dyn GatewayFilter>],
        forwarder: &'a dyn Forwarder,
    ) -> Self {
        Self {
            route,
            filters,
            forwarder,
        }
    }

    /// Filters still to run before the forward.
    pub fn remaining(&self) -> usize {
        self.filters.len()
    }

    /// Run the next filter, or forward once every filter has run.
    pub async fn proceed(self, exchange: &mut Exchange) -> Result<(), DispatchError> {
        match self.filters.split_first() {
            Some((next, rest)) => {
                tracing::trace!(route = self.route, filter = next.name(), "Running filter");
                let chain = Chain {
                    filters: rest,
                    ..self
                };
                next.filter(exchange, chain).await
            }
            None => self.complete(exchange).await,
        }
    }

    async fn complete(self, exchange: &mut Exchange) -> Result<(), DispatchError> {
        exchange.mark_chain_completed();

        let Some(url) = exchange.attributes().request_url().cloned() else {
            tracing::debug!(route = self.route, "No request URL resolved, not forwarding");
            if exchange.response().is_none() {
                exchange.set_response(empty_response());
            }
            return Ok(());
        };

        let request = exchange
            .outbound_request(url)
            .map_err(|reason| self.forward_error(ForwardError::InvalidRequest(reason)))?;
        let response = self
            .forwarder
            .forward(request)
            .await
            .map_err(|e| self.forward_error(e))?;

        exchange.mark_forwarded();
        exchange.set_response(response);
        Ok(())
    }

    fn forward_error(&self, source: ForwardError) -> DispatchError {
        DispatchError::Forward {
            route: self.route.to_string(),
            source,
        }
    }
}

impl fmt::Debug for Chain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("route", &self.route)
            .field("remaining", &self.filters.len())
            .finish()
    }
}
