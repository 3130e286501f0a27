//! Resolution of the outbound URL.

use async_trait::async_trait;

use crate::config::ArgumentError;
use crate::filter::chain::{Chain, GatewayFilter};
use crate::http::{DispatchError, Exchange};

/// Resolves the matched route's target against the current request.
///
/// The target supplies scheme and authority; path and query come from the
/// request as rewritten by the filters before this one. Routes without this
/// filter are never forwarded.
#[derive(Debug, Clone, Default)]
pub struct RouteToRequestUrl;

impl RouteToRequestUrl {
    pub fn from_args(args: &[String]) -> Result<Self, ArgumentError> {
        ArgumentError::check_arity(args, 0, 0)?;
        Ok(Self)
    }
}

#[async_trait]
impl GatewayFilter for RouteToRequestUrl {
    fn name(&self) -> &str {
        "RouteToRequestUrl"
    }

    async fn filter(&self, exchange: &mut Exchange, chain: Chain<'_>) -> Result<(), DispatchError> {
        let attributes = exchange.attributes();
        let route = attributes
            .matched_route()
            .ok_or_else(|| DispatchError::filter(self.name(), "no route bound to the exchange"))?;
        let url = route
            .target()
            .resolve(attributes.uri_variables(), exchange.uri())
            .map_err(|reason| DispatchError::filter(self.name(), reason))?;

        tracing::debug!(route = route.id(), url = %url, "Resolved request URL");
        exchange.attributes_mut().set_request_url(url);
        chain.proceed(exchange).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteDefinition;
    use crate::filter::builtin::RewritePath;
    use crate::filter::testing::{exchange, StubForwarder};
    use crate::http::UriVariables;
    use crate::routing::{Route, TargetTemplate};
    use std::sync::Arc;

    fn route(uri: &str) -> Arc<Route> {
        let definition = RouteDefinition {
            id: "r".to_string(),
            uri: uri.to_string(),
            predicates: Vec::new(),
            filters: Vec::new(),
        };
        Arc::new(Route::new(
            definition,
            TargetTemplate::parse(uri).unwrap(),
            Vec::new(),
            Vec::new(),
        ))
    }

    #[tokio::test]
    async fn resolves_after_rewrite() {
        let filters: Vec<Arc<dyn GatewayFilter>> = vec![
            Arc::new(
                RewritePath::from_args(&["/api/(?<seg>.*)".to_string(), "/${seg}".to_string()])
                    .unwrap(),
            ),
            Arc::new(RouteToRequestUrl),
        ];
        let forwarder = StubForwarder::ok();
        let mut ex = exchange("/api/users/42?x=1");
        ex.attributes_mut()
            .bind_route(route("http://users.internal:8080"), UriVariables::new());

        Chain::new("r", &filters, &forwarder)
            .proceed(&mut ex)
            .await
            .unwrap();

        let seen = forwarder.last().unwrap();
        assert_eq!(seen.uri.to_string(), "http://users.internal:8080/users/42?x=1");
        assert_eq!(
            ex.attributes().request_url().map(ToString::to_string).as_deref(),
            Some("http://users.internal:8080/users/42?x=1")
        );
    }

    #[tokio::test]
    async fn templated_target_uses_captured_variables() {
        let filters: Vec<Arc<dyn GatewayFilter>> = vec![Arc::new(RouteToRequestUrl)];
        let forwarder = StubForwarder::ok();
        let mut ex = exchange("/orders");
        let mut vars = UriVariables::new();
        vars.insert("tenant".to_string(), "acme".to_string());
        ex.attributes_mut()
            .bind_route(route("http://{tenant}.internal:9000"), vars);

        Chain::new("r", &filters, &forwarder)
            .proceed(&mut ex)
            .await
            .unwrap();

        assert_eq!(
            forwarder.last().unwrap().uri.to_string(),
            "http://acme.internal:9000/orders"
        );
    }

    #[tokio::test]
    async fn captured_host_cannot_redirect_the_forward() {
        let filters: Vec<Arc<dyn GatewayFilter>> = vec![Arc::new(RouteToRequestUrl)];
        let forwarder = StubForwarder::ok();
        let mut ex = exchange("/orders");
        let mut vars = UriVariables::new();
        vars.insert("tenant".to_string(), "localhost:6379/x".to_string());
        ex.attributes_mut()
            .bind_route(route("http://{tenant}.internal:9000"), vars);

        let err = Chain::new("r", &filters, &forwarder)
            .proceed(&mut ex)
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Filter { .. }));
        assert_eq!(forwarder.calls(), 0);
        assert!(ex.attributes().request_url().is_none());
    }

    #[tokio::test]
    async fn unbound_exchange_is_filter_error() {
        let filters: Vec<Arc<dyn GatewayFilter>> = vec![Arc::new(RouteToRequestUrl)];
        let forwarder = StubForwarder::ok();
        let mut ex = exchange("/orders");

        let err = Chain::new("r", &filters, &forwarder)
            .proceed(&mut ex)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Filter { .. }));
        assert_eq!(forwarder.calls(), 0);
        assert!(RouteToRequestUrl::from_args(&["extra".to_string()]).is_err());
    }
}
