//! Per-request exchange state.
//!
//! # Responsibilities
//! - Keep an immutable snapshot of the request as received
//! - Hold the in-flight (possibly rewritten) request and its body
//! - Hold the eventual response
//! - Carry attributes filters use to talk to each other
//!
//! # Design Decisions
//! - Owned by exactly one in-flight request; never shared across tasks
//! - The body stays a stream until the terminal forward consumes it
//! - Dropping the exchange releases the body and any pending response

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::request::Parts;
use axum::http::uri::PathAndQuery;
use axum::http::{header, Extensions, HeaderMap, Method, Request, Response, StatusCode, Uri};

use crate::routing::Route;

/// Template variables captured while matching a route.
pub type UriVariables = HashMap<String, String>;

/// The request exactly as it reached the gateway.
#[derive(Debug, Clone)]
pub struct OriginalRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

/// Values filters share during one exchange.
#[derive(Debug, Default)]
pub struct Attributes {
    matched_route: Option<Arc<Route>>,
    uri_variables: UriVariables,
    request_url: Option<Uri>,
    /// Free-form typed values for custom filters.
    pub extensions: Extensions,
}

impl Attributes {
    /// The route selected for this request.
    pub fn matched_route(&self) -> Option<&Arc<Route>> {
        self.matched_route.as_ref()
    }

    /// Variables captured by the matched route's predicates.
    pub fn uri_variables(&self) -> &UriVariables {
        &self.uri_variables
    }

    pub fn uri_variables_mut(&mut self) -> &mut UriVariables {
        &mut self.uri_variables
    }

    /// The resolved outbound URL, once the URL-resolution filter ran.
    pub fn request_url(&self) -> Option<&Uri> {
        self.request_url.as_ref()
    }

    pub fn set_request_url(&mut self, url: Uri) {
        self.request_url = Some(url);
    }

    pub(crate) fn bind_route(&mut self, route: Arc<Route>, variables: UriVariables) {
        self.matched_route = Some(route);
        self.uri_variables = variables;
    }
}

/// Request-scoped mutable context.
#[derive(Debug)]
pub struct Exchange {
    original: OriginalRequest,
    request: Parts,
    body: Option<Body>,
    response: Option<Response<Body>>,
    attributes: Attributes,
    chain_completed: bool,
    forwarded: bool,
}

impl Exchange {
    pub fn new(request: Request<Body>) -> Self {
        let (parts, body) = request.into_parts();
        let original = OriginalRequest {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
        };
        Self {
            original,
            request: parts,
            body: Some(body),
            response: None,
            attributes: Attributes::default(),
            chain_completed: false,
            forwarded: false,
        }
    }

    pub fn original(&self) -> &OriginalRequest {
        &self.original
    }

    // --- Current request ---

    pub fn method(&self) -> &Method {
        &self.request.method
    }

    pub fn set_method(&mut self, method: Method) {
        self.request.method = method;
    }

    pub fn uri(&self) -> &Uri {
        &self.request.uri
    }

    pub fn path(&self) -> &str {
        self.request.uri.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.request.uri.query()
    }

    /// Replace the request path, keeping the query string.
    pub fn set_path(&mut self, path: &str) -> Result<(), String> {
        if !path.starts_with('/') {
            return Err(format!("path '{}' must start with '/'", path));
        }
        let path_and_query = match self.query() {
            Some(query) => format!("{}?{}", path, query),
            None => path.to_string(),
        };
        let path_and_query = PathAndQuery::try_from(path_and_query)
            .map_err(|e| format!("invalid path '{}': {}", path, e))?;

        let mut parts = self.request.uri.clone().into_parts();
        parts.path_and_query = Some(path_and_query);
        self.request.uri = Uri::from_parts(parts).map_err(|e| e.to_string())?;
        Ok(())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.request.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.request.headers
    }

    /// Host the client addressed, without port.
    pub fn host(&self) -> Option<&str> {
        let raw = self
            .request
            .headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .or_else(|| self.request.uri.authority().map(|a| a.as_str()))?;
        Some(strip_port(raw))
    }

    /// All values of query parameter `name`, decoded.
    pub fn query_values(&self, name: &str) -> Vec<String> {
        let Some(query) = self.query() else {
            return Vec::new();
        };
        url::form_urlencoded::parse(query.as_bytes())
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
            .collect()
    }

    /// All values of cookie `name` across every `Cookie` header. Bytes that
    /// are not UTF-8 are replaced rather than hiding the cookie.
    pub fn cookie_values(&self, name: &str) -> Vec<String> {
        let mut values = Vec::new();
        for h in self.request.headers.get_all(header::COOKIE) {
            let h = String::from_utf8_lossy(h.as_bytes());
            for pair in h.split(';') {
                let pair = pair.trim();
                match pair.split_once('=') {
                    Some((k, v)) if k.trim() == name => values.push(v.trim().to_string()),
                    None if pair == name => values.push(String::new()),
                    _ => {}
                }
            }
        }
        values
    }

    /// Swap the request body, e.g. after a full-body rewrite.
    pub fn replace_body(&mut self, body: Body) -> Option<Body> {
        self.body.replace(body)
    }

    pub fn take_body(&mut self) -> Option<Body> {
        self.body.take()
    }

    // --- Response ---

    pub fn response(&self) -> Option<&Response<Body>> {
        self.response.as_ref()
    }

    pub fn response_mut(&mut self) -> Option<&mut Response<Body>> {
        self.response.as_mut()
    }

    pub fn set_response(&mut self, response: Response<Body>) {
        self.response = Some(response);
    }

    // --- Attributes ---

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    // --- Chain bookkeeping ---

    /// True once the terminal element of the chain has run.
    pub fn chain_completed(&self) -> bool {
        self.chain_completed
    }

    /// True once the backend answered this exchange.
    pub fn forwarded(&self) -> bool {
        self.forwarded
    }

    pub(crate) fn mark_chain_completed(&mut self) {
        self.chain_completed = true;
    }

    pub(crate) fn mark_forwarded(&mut self) {
        self.forwarded = true;
    }

    /// Build the outbound request for `url` from the current request state.
    /// Consumes the body; hop-by-hop headers are dropped.
    pub(crate) fn outbound_request(&mut self, url: Uri) -> Result<Request<Body>, String> {
        let body = self
            .body
            .take()
            .ok_or_else(|| "request body already consumed".to_string())?;

        let mut headers = self.request.headers.clone();
        crate::http::forward::strip_hop_by_hop(&mut headers);
        headers.remove(header::HOST);

        let mut request = Request::builder()
            .method(self.request.method.clone())
            .uri(url)
            .body(body)
            .map_err(|e| e.to_string())?;
        *request.headers_mut() = headers;
        Ok(request)
    }

    /// Take the final response, synthesizing an empty `200` if none was set.
    pub(crate) fn take_response(&mut self) -> Response<Body> {
        self.response.take().unwrap_or_else(empty_response)
    }
}

/// An empty `200 OK`.
pub fn empty_response() -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::OK;
    response
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        // IPv6 literal: keep the brackets, drop what follows ']'.
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    }
}
