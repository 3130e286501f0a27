//! Compiled routes.

use std::fmt;
use std::sync::Arc;

use axum::http::uri::{Authority, Scheme};
use axum::http::Uri;

use crate::config::RouteDefinition;
use crate::filter::GatewayFilter;
use crate::http::{Exchange, UriVariables};
use crate::routing::pattern::{check_template, expand_template, placeholder_names};
use crate::routing::predicate::Predicate;

/// An immutable route: predicates, filters and a target.
pub struct Route {
    id: String,
    target: TargetTemplate,
    predicates: Vec<Arc<dyn Predicate>>,
    filters: Vec<Arc<dyn GatewayFilter>>,
    definition: RouteDefinition,
}

impl Route {
    pub fn new(
        definition: RouteDefinition,
        target: TargetTemplate,
        predicates: Vec<Arc<dyn Predicate>>,
        filters: Vec<Arc<dyn GatewayFilter>>,
    ) -> Self {
        Self {
            id: definition.id.clone(),
            target,
            predicates,
            filters,
            definition,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn target(&self) -> &TargetTemplate {
        &self.target
    }

    pub fn filters(&self) -> &[Arc<dyn GatewayFilter>] {
        &self.filters
    }

    /// The definition this route was built from.
    pub fn definition(&self) -> &RouteDefinition {
        &self.definition
    }

    /// Evaluate predicates in declaration order, stopping at the first
    /// failure. A route without predicates matches everything.
    pub fn matches(&self, exchange: &Exchange, captures: &mut UriVariables) -> bool {
        self.predicates.iter().all(|p| p.test(exchange, captures))
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("id", &self.id)
            .field("target", &self.target.as_str())
            .field("predicates", &self.predicates.len())
            .field("filters", &self.filters.len())
            .finish()
    }
}

/// A route target whose `{name}` placeholders are filled from captured
/// variables. Only scheme and authority are ever used.
///
/// Placeholder values must be single DNS labels, so a captured value can
/// never change the port or move the request to a host outside the
/// template's domain.
#[derive(Debug, Clone)]
pub struct TargetTemplate {
    raw: String,
    fixed: Option<(Scheme, Authority)>,
    placeholders: Vec<String>,
    port: u16,
    host_suffix: String,
}

impl TargetTemplate {
    pub fn parse(raw: &str) -> Result<Self, String> {
        check_template(raw).map_err(|e| e.to_string())?;

        let placeholders: Vec<String> = placeholder_names(raw)
            .into_iter()
            .map(str::to_string)
            .collect();
        let templated = !placeholders.is_empty();
        // Placeholders are checked with a stand-in label.
        let stand_in: UriVariables = placeholders
            .iter()
            .map(|name| (name.clone(), "x".to_string()))
            .collect();
        let probe = expand_template(raw, &stand_in)?;

        let url = url::Url::parse(&probe).map_err(|e| e.to_string())?;
        if url.scheme() != "http" {
            return Err(format!("unsupported scheme '{}'", url.scheme()));
        }
        if url.host_str().is_none() {
            return Err("missing host".to_string());
        }
        if !matches!(url.path(), "" | "/") || url.query().is_some() || url.fragment().is_some() {
            return Err("target must not carry a path, query or fragment".to_string());
        }

        let fixed = if templated {
            None
        } else {
            Some(split_origin(raw)?)
        };

        Ok(Self {
            raw: raw.to_string(),
            fixed,
            placeholders,
            port: url.port_or_known_default().unwrap_or(80),
            host_suffix: literal_host_suffix(raw),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Combine this target's origin with the path and query of `current`.
    pub fn resolve(&self, variables: &UriVariables, current: &Uri) -> Result<Uri, String> {
        let (scheme, authority) = match &self.fixed {
            Some(origin) => origin.clone(),
            None => self.expand_origin(variables)?,
        };
        let path_and_query = current
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        Uri::builder()
            .scheme(scheme)
            .authority(authority)
            .path_and_query(path_and_query)
            .build()
            .map_err(|e| e.to_string())
    }

    fn expand_origin(&self, variables: &UriVariables) -> Result<(Scheme, Authority), String> {
        for name in &self.placeholders {
            if let Some(value) = variables.get(name) {
                if !is_host_label(value) {
                    return Err(format!(
                        "value '{}' of template variable '{}' is not a host label",
                        value, name
                    ));
                }
            }
        }

        let (scheme, authority) = split_origin(&expand_template(&self.raw, variables)?)?;
        let host = authority.host().to_ascii_lowercase();
        if authority.port_u16().unwrap_or(80) != self.port || !host.ends_with(&self.host_suffix) {
            return Err(format!(
                "expanded target '{}' leaves the origin of '{}'",
                authority, self.raw
            ));
        }
        Ok((scheme, authority))
    }
}

/// Letters, digits and hyphens only.
fn is_host_label(value: &str) -> bool {
    !value.is_empty()
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

/// The literal host text after the last placeholder, lower-cased:
/// `.internal` for `http://{tenant}.internal:9000`.
fn literal_host_suffix(raw: &str) -> String {
    let Some(end) = raw.rfind('}') else {
        return String::new();
    };
    let tail = &raw[end + 1..];
    let cut = tail.find([':', '/']).unwrap_or(tail.len());
    tail[..cut].to_ascii_lowercase()
}

fn split_origin(raw: &str) -> Result<(Scheme, Authority), String> {
    let uri: Uri = raw
        .parse()
        .map_err(|e| format!("invalid target '{}': {}", raw, e))?;
    let parts = uri.into_parts();
    match (parts.scheme, parts.authority) {
        (Some(scheme), Some(authority)) => Ok((scheme, authority)),
        _ => Err(format!("target '{}' needs a scheme and authority", raw)),
    }
}
