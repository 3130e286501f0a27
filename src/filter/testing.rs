//! Helpers shared by the filter and handler unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, Response, Uri};

use crate::http::{Exchange, ForwardError, Forwarder};

pub(crate) fn exchange(uri: &str) -> Exchange {
    Exchange::new(
        Request::builder()
            .uri(uri)
            .header("host", "gateway.local")
            .body(Body::empty())
            .unwrap(),
    )
}

/// An exchange whose request URL already points at `origin`.
pub(crate) fn exchange_for(uri: &str, origin: &str) -> Exchange {
    let mut ex = exchange(uri);
    let url: Uri = format!("{}{}", origin, uri).parse().unwrap();
    ex.attributes_mut().set_request_url(url);
    ex
}

/// What the stub saw of an outbound request.
#[derive(Debug, Clone)]
pub(crate) struct SeenRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

/// Forwarder that records requests and answers `200` with `x-trace: backend`,
/// or refuses every call.
#[derive(Debug, Default)]
pub(crate) struct StubForwarder {
    fail: bool,
    calls: AtomicUsize,
    seen: Mutex<Vec<SeenRequest>>,
}

impl StubForwarder {
    pub(crate) fn ok() -> Self {
        Self::default()
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last(&self) -> Option<SeenRequest> {
        self.seen.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Forwarder for StubForwarder {
    async fn forward(&self, request: Request<Body>) -> Result<Response<Body>, ForwardError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (parts, _body) = request.into_parts();
        self.seen.lock().unwrap().push(SeenRequest {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
        });
        if self.fail {
            return Err(ForwardError::ConnectRefused);
        }
        Ok(Response::builder()
            .status(200)
            .header("x-trace", "backend")
            .body(Body::from("stub"))
            .unwrap())
    }
}
