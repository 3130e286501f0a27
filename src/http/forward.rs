//! Outbound forwarding to the resolved target.
//!
//! # Responsibilities
//! - Send the rewritten request to the backend
//! - Stream the request body out and the response body back
//! - Classify transport failures into a distinct cause
//!
//! # Design Decisions
//! - No timeout beyond the transport's connect timeout unless
//!   `timeouts.response_secs` is configured
//! - Never retries; retry belongs to a filter
//! - Dropping the forward future cancels the outbound call; a half-used
//!   connection is discarded rather than pooled

use std::error::Error as StdError;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, Request, Response};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

use crate::config::TimeoutConfig;

/// Why an outbound call failed.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The backend actively refused the connection.
    #[error("connection refused by upstream")]
    ConnectRefused,

    /// Any other failure to establish the connection.
    #[error("failed to connect to upstream: {0}")]
    Connect(String),

    /// Connect or response deadline exceeded.
    #[error("upstream timed out after {0:?}")]
    Timeout(Duration),

    /// The backend answered with something that is not valid HTTP.
    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),

    /// The connection broke after it was established.
    #[error("upstream transport error: {0}")]
    Transport(String),

    /// The outbound request could not be built.
    #[error("invalid outbound request: {0}")]
    InvalidRequest(String),
}

impl ForwardError {
    /// Short label for logs and metrics.
    pub fn cause(&self) -> &'static str {
        match self {
            ForwardError::ConnectRefused => "connect_refused",
            ForwardError::Connect(_) => "connect",
            ForwardError::Timeout(_) => "timeout",
            ForwardError::MalformedResponse(_) => "malformed_response",
            ForwardError::Transport(_) => "transport",
            ForwardError::InvalidRequest(_) => "invalid_request",
        }
    }
}

/// Asynchronous send capability used as the chain's terminal element.
#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn forward(&self, request: Request<Body>) -> Result<Response<Body>, ForwardError>;
}

/// Forwarder backed by a pooled hyper client.
#[derive(Clone)]
pub struct HttpForwarder {
    client: Client<HttpConnector, Body>,
    connect_timeout: Duration,
    response_timeout: Option<Duration>,
}

impl HttpForwarder {
    pub fn new(config: &TimeoutConfig) -> Self {
        let connect_timeout = Duration::from_secs(config.connect_secs);
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(config.idle_secs))
            .build(connector);

        Self {
            client,
            connect_timeout,
            response_timeout: config.response_secs.map(Duration::from_secs),
        }
    }
}

impl Default for HttpForwarder {
    fn default() -> Self {
        Self::new(&TimeoutConfig::default())
    }
}

#[async_trait]
impl Forwarder for HttpForwarder {
    async fn forward(&self, request: Request<Body>) -> Result<Response<Body>, ForwardError> {
        let uri = request.uri().clone();
        tracing::debug!(method = %request.method(), uri = %uri, "Forwarding request");

        let pending = self.client.request(request);
        let result = match self.response_timeout {
            Some(deadline) => tokio::time::timeout(deadline, pending)
                .await
                .map_err(|_| ForwardError::Timeout(deadline))?,
            None => pending.await,
        };
        let response = result.map_err(|e| classify(&e, self.connect_timeout))?;

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

/// Map a client error onto a forward failure cause.
fn classify(err: &hyper_util::client::legacy::Error, connect_timeout: Duration) -> ForwardError {
    if let Some(io_err) = find_source::<io::Error>(err) {
        match io_err.kind() {
            io::ErrorKind::ConnectionRefused => return ForwardError::ConnectRefused,
            io::ErrorKind::TimedOut => return ForwardError::Timeout(connect_timeout),
            _ => {}
        }
    }
    if err.is_connect() {
        return ForwardError::Connect(describe(err));
    }
    if let Some(hyper_err) = find_source::<hyper::Error>(err) {
        if hyper_err.is_parse() || hyper_err.is_parse_status() {
            return ForwardError::MalformedResponse(describe(err));
        }
        if hyper_err.is_timeout() {
            return ForwardError::Timeout(connect_timeout);
        }
    }
    ForwardError::Transport(describe(err))
}

fn find_source<'a, T: StdError + 'static>(err: &'a (dyn StdError + 'static)) -> Option<&'a T> {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(found) = e.downcast_ref::<T>() {
            return Some(found);
        }
        current = e.source();
    }
    None
}

fn describe(err: &(dyn StdError + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(e) = source {
        out.push_str(": ");
        out.push_str(&e.to_string());
        source = e.source();
    }
    out
}

/// Headers that describe a single connection and must not be relayed.
const HOP_BY_HOP: [&str; 7] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Remove hop-by-hop headers, including any listed in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::try_from(name.trim()).ok())
        .collect();
    for name in &listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}
