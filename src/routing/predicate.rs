//! Request predicates.
//!
//! # Responsibilities
//! - Test one aspect of a request (host, method, path, header, query, cookie)
//! - Capture template variables for later filters
//!
//! # Design Decisions
//! - Predicates are pure: no I/O, no mutation of the exchange
//! - Arguments are validated when the predicate is built, so evaluation
//!   never fails; it only answers true or false
//! - Host and method comparisons are case-insensitive
//! - Value regexes must match the whole value

use std::fmt;

use axum::http::{HeaderName, Method};
use regex::Regex;

use crate::config::ArgumentError;
use crate::http::{Exchange, UriVariables};
use crate::routing::pattern::SegmentPattern;

/// Trait for boolean tests over a request.
pub trait Predicate: Send + Sync + fmt::Debug {
    /// Returns true if the exchange satisfies this predicate.
    ///
    /// Captured variables are written to `captures`; they are only kept if
    /// the whole route matches.
    fn test(&self, exchange: &Exchange, captures: &mut UriVariables) -> bool;
}

/// Matches the Host header against a dot-segmented template.
#[derive(Debug, Clone)]
pub struct HostPredicate {
    pattern: SegmentPattern,
}

impl HostPredicate {
    pub fn new(pattern: &str) -> Result<Self, ArgumentError> {
        Ok(Self {
            pattern: SegmentPattern::host(pattern)?,
        })
    }

    pub fn from_args(args: &[String]) -> Result<Self, ArgumentError> {
        ArgumentError::check_arity(args, 1, 1)?;
        Self::new(&args[0])
    }
}

impl Predicate for HostPredicate {
    fn test(&self, exchange: &Exchange, captures: &mut UriVariables) -> bool {
        exchange
            .host()
            .map(|host| self.pattern.capture_into(host, captures))
            .unwrap_or(false)
    }
}

/// Matches the request method.
#[derive(Debug, Clone)]
pub struct MethodPredicate {
    methods: Vec<Method>,
}

impl MethodPredicate {
    pub fn from_args(args: &[String]) -> Result<Self, ArgumentError> {
        if args.is_empty() {
            return Err(ArgumentError::new("expected at least one method"));
        }
        let methods = args
            .iter()
            .map(|m| {
                Method::from_bytes(m.to_ascii_uppercase().as_bytes())
                    .map_err(|_| ArgumentError::new(format!("invalid method '{}'", m)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { methods })
    }
}

impl Predicate for MethodPredicate {
    fn test(&self, exchange: &Exchange, _captures: &mut UriVariables) -> bool {
        let method = exchange.method().as_str();
        self.methods
            .iter()
            .any(|m| m.as_str().eq_ignore_ascii_case(method))
    }
}

/// Matches the request path against a segment template.
#[derive(Debug, Clone)]
pub struct PathPredicate {
    pattern: SegmentPattern,
}

impl PathPredicate {
    pub fn new(pattern: &str) -> Result<Self, ArgumentError> {
        Ok(Self {
            pattern: SegmentPattern::path(pattern)?,
        })
    }

    pub fn from_args(args: &[String]) -> Result<Self, ArgumentError> {
        ArgumentError::check_arity(args, 1, 1)?;
        Self::new(&args[0])
    }
}

impl Predicate for PathPredicate {
    fn test(&self, exchange: &Exchange, captures: &mut UriVariables) -> bool {
        self.pattern.capture_into(exchange.path(), captures)
    }
}

/// Optional whole-value regex shared by the key/value predicates.
#[derive(Debug, Clone)]
struct ValueMatcher(Option<Regex>);

impl ValueMatcher {
    fn parse(arg: Option<&String>) -> Result<Self, ArgumentError> {
        match arg {
            Some(re) => Ok(Self(Some(Regex::new(&format!("^(?:{})$", re))?))),
            None => Ok(Self(None)),
        }
    }

    fn any<S: AsRef<str>>(&self, mut values: impl Iterator<Item = S>) -> bool {
        match &self.0 {
            Some(re) => values.any(|v| re.is_match(v.as_ref())),
            None => values.next().is_some(),
        }
    }
}

/// Matches a request header, optionally constraining its value.
#[derive(Debug, Clone)]
pub struct HeaderPredicate {
    name: HeaderName,
    value: ValueMatcher,
}

impl HeaderPredicate {
    pub fn from_args(args: &[String]) -> Result<Self, ArgumentError> {
        ArgumentError::check_arity(args, 1, 2)?;
        let name = HeaderName::try_from(args[0].as_str())
            .map_err(|_| ArgumentError::new(format!("invalid header name '{}'", args[0])))?;
        Ok(Self {
            name,
            value: ValueMatcher::parse(args.get(1))?,
        })
    }
}

impl Predicate for HeaderPredicate {
    fn test(&self, exchange: &Exchange, _captures: &mut UriVariables) -> bool {
        let values = exchange
            .headers()
            .get_all(&self.name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()));
        self.value.any(values)
    }
}

/// Matches a query parameter, optionally constraining its value.
#[derive(Debug, Clone)]
pub struct QueryPredicate {
    param: String,
    value: ValueMatcher,
}

impl QueryPredicate {
    pub fn from_args(args: &[String]) -> Result<Self, ArgumentError> {
        ArgumentError::check_arity(args, 1, 2)?;
        if args[0].is_empty() {
            return Err(ArgumentError::new("query parameter name must not be empty"));
        }
        Ok(Self {
            param: args[0].clone(),
            value: ValueMatcher::parse(args.get(1))?,
        })
    }
}

impl Predicate for QueryPredicate {
    fn test(&self, exchange: &Exchange, _captures: &mut UriVariables) -> bool {
        let values = exchange.query_values(&self.param);
        self.value.any(values.iter().map(String::as_str))
    }
}

/// Matches a cookie, optionally constraining its value.
#[derive(Debug, Clone)]
pub struct CookiePredicate {
    name: String,
    value: ValueMatcher,
}

impl CookiePredicate {
    pub fn from_args(args: &[String]) -> Result<Self, ArgumentError> {
        ArgumentError::check_arity(args, 1, 2)?;
        if args[0].is_empty() {
            return Err(ArgumentError::new("cookie name must not be empty"));
        }
        Ok(Self {
            name: args[0].clone(),
            value: ValueMatcher::parse(args.get(1))?,
        })
    }
}

impl Predicate for CookiePredicate {
    fn test(&self, exchange: &Exchange, _captures: &mut UriVariables) -> bool {
        self.value.any(exchange.cookie_values(&self.name).into_iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{HeaderValue, Request};

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn exchange(builder: axum::http::request::Builder) -> Exchange {
        Exchange::new(builder.body(Body::empty()).unwrap())
    }

    fn check(p: &dyn Predicate, ex: &Exchange) -> bool {
        p.test(ex, &mut UriVariables::new())
    }

    #[test]
    fn test_host_predicate() {
        let p = HostPredicate::from_args(&args(&["*.example.com"])).unwrap();

        let ex = exchange(Request::builder().header("Host", "api.example.com"));
        assert!(check(&p, &ex));

        let ex = exchange(Request::builder().header("Host", "API.EXAMPLE.COM:8080"));
        assert!(check(&p, &ex)); // Case insensitive, port ignored

        // One label only
        let ex = exchange(Request::builder().header("Host", "a.b.example.com"));
        assert!(!check(&p, &ex));

        let ex = exchange(Request::builder().uri("/"));
        assert!(!check(&p, &ex));
    }

    #[test]
    fn test_method_predicate() {
        let p = MethodPredicate::from_args(&args(&["get", "POST"])).unwrap();

        assert!(check(&p, &exchange(Request::builder().method("GET"))));
        assert!(check(&p, &exchange(Request::builder().method("POST"))));
        assert!(!check(&p, &exchange(Request::builder().method("DELETE"))));

        assert!(MethodPredicate::from_args(&[]).is_err());
        assert!(MethodPredicate::from_args(&args(&["GE T"])).is_err());
    }

    #[test]
    fn test_path_predicate_captures() {
        let p = PathPredicate::from_args(&args(&["/users/{id}/**"])).unwrap();
        let ex = exchange(Request::builder().uri("/users/42/orders?x=1"));

        let mut captures = UriVariables::new();
        assert!(p.test(&ex, &mut captures));
        assert_eq!(captures["id"], "42");

        let ex = exchange(Request::builder().uri("/accounts/42"));
        assert!(!check(&p, &ex));
    }

    #[test]
    fn test_header_predicate() {
        let presence = HeaderPredicate::from_args(&args(&["X-Request-Id"])).unwrap();
        let regex = HeaderPredicate::from_args(&args(&["X-Version", "v\\d"])).unwrap();

        let ex = exchange(
            Request::builder()
                .header("x-request-id", "abc")
                .header("x-version", "beta")
                .header("x-version", "v2"),
        );
        assert!(check(&presence, &ex));
        assert!(check(&regex, &ex)); // any value may match

        let ex = exchange(Request::builder().header("x-version", "v22"));
        assert!(!check(&presence, &ex));
        assert!(!check(&regex, &ex)); // whole-value match

        let mut ex = exchange(Request::builder());
        ex.headers_mut().insert(
            "x-name",
            HeaderValue::from_bytes("café".as_bytes()).unwrap(),
        );
        let name = HeaderPredicate::from_args(&args(&["X-Name"])).unwrap();
        let prefix = HeaderPredicate::from_args(&args(&["X-Name", "caf.*"])).unwrap();
        assert!(check(&name, &ex)); // present even when not visible ASCII
        assert!(check(&prefix, &ex));

        assert!(HeaderPredicate::from_args(&args(&["bad header"])).is_err());
        assert!(HeaderPredicate::from_args(&args(&["X-Version", "("])).is_err());
    }

    #[test]
    fn test_query_predicate() {
        let presence = QueryPredicate::from_args(&args(&["debug"])).unwrap();
        let regex = QueryPredicate::from_args(&args(&["page", "[0-9]+"])).unwrap();

        let ex = exchange(Request::builder().uri("/list?debug&page=3"));
        assert!(check(&presence, &ex));
        assert!(check(&regex, &ex));

        let ex = exchange(Request::builder().uri("/list?page=last"));
        assert!(!check(&presence, &ex));
        assert!(!check(&regex, &ex));
    }

    #[test]
    fn test_cookie_predicate() {
        let p = CookiePredicate::from_args(&args(&["session", "[a-f0-9]+"])).unwrap();

        let ex = exchange(Request::builder().header("cookie", "theme=dark; session=beef01"));
        assert!(check(&p, &ex));

        let ex = exchange(Request::builder().header("cookie", "session=NOPE"));
        assert!(!check(&p, &ex));

        let ex = exchange(Request::builder());
        assert!(!check(&p, &ex));
    }
}
