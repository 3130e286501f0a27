//! Route reload against a running gateway.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{client, serve, start_echo_backend, TestGateway};
use edge_gateway::config::{load_config, ReloadRequest};
use edge_gateway::routing::FileRouteSource;
use edge_gateway::Gateway;

fn routes(backend: std::net::SocketAddr, path: &str) -> String {
    format!(
        r#"
[[routes]]
id = "only"
uri = "http://{backend}"
predicates = ["Url={path}"]
filters = ["RouteToRequestUrl"]
"#
    )
}

async fn status(gateway: &TestGateway, path: &str) -> u16 {
    client()
        .get(gateway.url(path))
        .send()
        .await
        .unwrap()
        .status()
        .as_u16()
}

/// Poll until `path` answers `expected`, or give up after a few seconds.
async fn wait_for(gateway: &TestGateway, path: &str, expected: u16) -> bool {
    for _ in 0..50 {
        if status(gateway, path).await == expected {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test]
async fn reload_swaps_routes_and_keeps_them_on_failure() {
    let (backend, _hits) = start_echo_backend().await;
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), routes(backend, "/v1")).unwrap();

    let gateway = Gateway::builder(load_config(file.path()).unwrap())
        .route_source(Arc::new(FileRouteSource::new(file.path())))
        .build()
        .unwrap();
    let gateway = serve(gateway).await;

    assert_eq!(status(&gateway, "/v1").await, 200);
    assert_eq!(status(&gateway, "/v2").await, 404);

    std::fs::write(file.path(), routes(backend, "/v2")).unwrap();
    gateway.reloads.send(ReloadRequest::Signal).unwrap();

    assert!(wait_for(&gateway, "/v2", 200).await);
    assert_eq!(status(&gateway, "/v1").await, 404);

    // An unknown predicate fails the rebuild; the current routes stay.
    std::fs::write(
        file.path(),
        routes(backend, "/v3").replace("Url=", "Nope="),
    )
    .unwrap();
    gateway.reloads.send(ReloadRequest::Signal).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(status(&gateway, "/v2").await, 200);
    assert_eq!(status(&gateway, "/v3").await, 404);
}
