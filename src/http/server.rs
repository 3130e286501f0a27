//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with a single catch-all handler
//! - Wire up middleware (request ID, tracing)
//! - Serve on a bound listener until shutdown is signalled

use axum::{
    body::Body,
    extract::State,
    http::{Request, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::http::handler::FilteringHandler;
use crate::http::request::UuidRequestId;

/// HTTP front end of the gateway.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(handler: FilteringHandler) -> Self {
        Self {
            router: Self::build_router(handler),
        }
    }

    /// Every path and method goes to the filtering handler.
    fn build_router(handler: FilteringHandler) -> Router {
        Router::new()
            .fallback(dispatch)
            .with_state(handler)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// The router, for embedding or in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn dispatch(State(handler): State<FilteringHandler>, request: Request<Body>) -> Response<Body> {
    handler.handle_request(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::testing::StubForwarder;
    use crate::filter::FilterRegistry;
    use crate::http::request::X_REQUEST_ID;
    use crate::routing::{PredicateRegistry, RouteLocator, RouteTable};
    use axum::http::StatusCode;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn server() -> HttpServer {
        let predicates = PredicateRegistry::with_builtins();
        let filters = FilterRegistry::with_builtins();
        let locator = Arc::new(RouteLocator::new(RouteTable::default(), predicates, filters));
        HttpServer::new(FilteringHandler::new(
            locator,
            Vec::new(),
            Arc::new(StubForwarder::ok()),
        ))
    }

    #[tokio::test]
    async fn unmatched_request_gets_404_and_request_id() {
        let response = server()
            .router()
            .oneshot(Request::builder().uri("/nothing").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key(X_REQUEST_ID));
    }

    #[tokio::test]
    async fn client_request_id_is_kept() {
        let response = server()
            .router()
            .oneshot(
                Request::builder()
                    .uri("/nothing")
                    .header(X_REQUEST_ID, "client-id-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()[X_REQUEST_ID], "client-id-1");
    }
}
