//! Startup orchestration.
//!
//! # Responsibilities
//! - Build registries, the initial route table and the global filters
//! - Assemble the filtering handler around a forwarder
//! - Run the HTTP server, the admin API and the reload loop
//!
//! # Design Decisions
//! - Fail fast: any error while building routes is fatal at startup
//! - Global filters are built once; reloads replace only the routes
//! - Listeners are bound by the caller, so tests can use port 0

use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};

use crate::admin::{setup_admin_router, AdminState};
use crate::config::{ConfigError, GatewayConfig, ReloadRequest};
use crate::filter::FilterRegistry;
use crate::http::{FilteringHandler, Forwarder, HttpForwarder, HttpServer};
use crate::routing::{PredicateRegistry, RouteLocator, RouteSource, StaticRouteSource};

/// Errors that stop the gateway from starting or serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A fully assembled gateway.
pub struct Gateway {
    config: GatewayConfig,
    source: Arc<dyn RouteSource>,
    handler: FilteringHandler,
}

impl Gateway {
    pub fn builder(config: GatewayConfig) -> GatewayBuilder {
        GatewayBuilder::new(config)
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn handler(&self) -> &FilteringHandler {
        &self.handler
    }

    pub fn locator(&self) -> &Arc<RouteLocator> {
        self.handler.locator()
    }

    /// Re-query the route source and swap in the new routes.
    pub fn reload(&self) -> Result<usize, ConfigError> {
        self.locator().reload(self.source.as_ref())
    }

    /// Serve until `shutdown` fires. Reload requests arriving on `reloads`
    /// rebuild the route table; failures keep the current routes.
    pub async fn run(
        self,
        listener: TcpListener,
        mut reloads: mpsc::UnboundedReceiver<ReloadRequest>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), StartupError> {
        if self.config.admin.enabled {
            let admin_listener = TcpListener::bind(&self.config.admin.bind_address).await?;
            let state = AdminState::new(
                Arc::clone(self.locator()),
                self.config
                    .gateway
                    .global_filters
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
                &self.config.admin.api_key,
            );
            let mut admin_shutdown = shutdown.resubscribe();
            tracing::info!(address = %self.config.admin.bind_address, "Admin API starting");
            tokio::spawn(async move {
                let served = axum::serve(admin_listener, setup_admin_router(state))
                    .with_graceful_shutdown(async move {
                        let _ = admin_shutdown.recv().await;
                    })
                    .await;
                if let Err(e) = served {
                    tracing::error!(error = %e, "Admin API failed");
                }
            });
        }

        let locator = Arc::clone(self.locator());
        let source = Arc::clone(&self.source);
        let mut reload_shutdown = shutdown.resubscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    request = reloads.recv() => match request {
                        Some(request) => {
                            tracing::info!(trigger = ?request, "Reloading routes");
                            // Failures are logged by the locator.
                            let _ = locator.reload(source.as_ref());
                        }
                        None => break,
                    },
                    _ = reload_shutdown.recv() => break,
                }
            }
        });

        HttpServer::new(self.handler).run(listener, shutdown).await?;
        Ok(())
    }
}

/// Builder for [`Gateway`].
pub struct GatewayBuilder {
    config: GatewayConfig,
    source: Option<Arc<dyn RouteSource>>,
    forwarder: Option<Arc<dyn Forwarder>>,
    predicates: PredicateRegistry,
    filters: FilterRegistry,
}

impl GatewayBuilder {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            source: None,
            forwarder: None,
            predicates: PredicateRegistry::with_builtins(),
            filters: FilterRegistry::with_builtins(),
        }
    }

    /// Where routes come from. Defaults to the routes in the config.
    pub fn route_source(mut self, source: Arc<dyn RouteSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// The outbound transport. Defaults to [`HttpForwarder`].
    pub fn forwarder(mut self, forwarder: Arc<dyn Forwarder>) -> Self {
        self.forwarder = Some(forwarder);
        self
    }

    pub fn predicates(mut self, predicates: PredicateRegistry) -> Self {
        self.predicates = predicates;
        self
    }

    pub fn filters(mut self, filters: FilterRegistry) -> Self {
        self.filters = filters;
        self
    }

    pub fn build(self) -> Result<Gateway, StartupError> {
        let source = self
            .source
            .unwrap_or_else(|| Arc::new(StaticRouteSource::new(self.config.routes.clone())));
        let forwarder = self
            .forwarder
            .unwrap_or_else(|| Arc::new(HttpForwarder::new(&self.config.timeouts)));

        let global_filters = self
            .filters
            .build_all("global filters", &self.config.gateway.global_filters)?;
        let locator = RouteLocator::from_source(source.as_ref(), self.predicates, self.filters)?;

        tracing::info!(
            routes = locator.snapshot().len(),
            global_filters = global_filters.len(),
            "Gateway assembled"
        );

        let handler = FilteringHandler::new(Arc::new(locator), global_filters, forwarder);
        Ok(Gateway {
            config: self.config,
            source,
            handler,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{parse_config, ComponentDefinition};
    use crate::filter::testing::StubForwarder;
    use crate::http::{Dispatch, Exchange};
    use axum::body::Body;
    use axum::http::{Method, Request};

    const CONFIG: &str = r#"
[gateway]
global_filters = ["AddRequestHeader=X-Gateway, edge"]

[[routes]]
id = "users"
uri = "http://users.internal:8080"
predicates = ["Url=/users/{id}", "Method=GET"]
filters = ["SetPath=/v2/users/{id}", "RouteToRequestUrl"]
"#;

    #[tokio::test]
    async fn builds_from_config_routes() {
        let forwarder = Arc::new(StubForwarder::ok());
        let gateway = Gateway::builder(parse_config(CONFIG).unwrap())
            .forwarder(forwarder.clone())
            .build()
            .unwrap();

        let request = Request::builder().uri("/users/7").body(Body::empty()).unwrap();
        let outcome = gateway.handler().handle(Exchange::new(request)).await.unwrap();

        assert!(matches!(outcome, Dispatch::Forwarded(_)));
        let seen = forwarder.last().unwrap();
        assert_eq!(seen.method, Method::GET);
        assert_eq!(seen.uri.to_string(), "http://users.internal:8080/v2/users/7");
        assert_eq!(seen.headers["x-gateway"], "edge");
    }

    #[test]
    fn unknown_global_filter_fails_startup() {
        let mut config = parse_config(CONFIG).unwrap();
        config
            .gateway
            .global_filters
            .push(ComponentDefinition::new("Retry", ["3"]));

        let err = Gateway::builder(config)
            .forwarder(Arc::new(StubForwarder::ok()))
            .build()
            .err()
            .unwrap();
        assert!(matches!(
            err,
            StartupError::Config(ConfigError::UnknownFilter { .. })
        ));
    }

    #[test]
    fn reload_uses_the_route_source() {
        let gateway = Gateway::builder(parse_config(CONFIG).unwrap())
            .route_source(Arc::new(StaticRouteSource::default()))
            .forwarder(Arc::new(StubForwarder::ok()))
            .build()
            .unwrap();
        assert!(gateway.locator().snapshot().is_empty());

        assert_eq!(gateway.reload().unwrap(), 0);
    }
}
