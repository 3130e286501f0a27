//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Worker pool sizing.
    pub runtime: RuntimeConfig,

    /// Outbound transport timeouts.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin (introspection) API settings.
    pub admin: AdminConfig,

    /// Settings shared by every route.
    pub gateway: GlobalConfig,

    /// Route definitions, in match order.
    pub routes: Vec<RouteDefinition>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Runtime configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Number of Tokio worker threads. `None` uses one per core.
    pub worker_threads: Option<usize>,
}

/// Timeouts applied by the outbound transport.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Time to wait for the backend's response head, in seconds.
    /// Unset means no deadline beyond the connect timeout.
    pub response_secs: Option<u64>,

    /// Idle pooled connection timeout in seconds.
    pub idle_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            response_secs: None,
            idle_secs: 60,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// Gateway-wide settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Filters prepended to every route's filter list.
    pub global_filters: Vec<ComponentDefinition>,
}

/// A route as declared by the route source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RouteDefinition {
    /// Unique route identifier.
    pub id: String,

    /// Target URI template (scheme and authority only).
    pub uri: String,

    /// Predicates, all of which must hold.
    #[serde(default)]
    pub predicates: Vec<ComponentDefinition>,

    /// Filters, in execution order.
    #[serde(default)]
    pub filters: Vec<ComponentDefinition>,
}

/// A named predicate or filter with its string arguments.
///
/// Accepts either the shorthand `"Name=arg1, arg2"` or a table
/// `{ name = "Name", args = ["arg1", "arg2"] }`. Use the table form when an
/// argument contains a comma.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "DefinitionRepr")]
pub struct ComponentDefinition {
    pub name: String,
    pub args: Vec<String>,
}

impl ComponentDefinition {
    pub fn new<I, S>(name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl FromStr for ComponentDefinition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, rest) = match s.split_once('=') {
            Some((name, rest)) => (name.trim(), Some(rest)),
            None => (s.trim(), None),
        };
        if name.is_empty() {
            return Err(format!("missing name in definition '{}'", s));
        }
        let args = match rest {
            Some(rest) if !rest.trim().is_empty() => {
                rest.split(',').map(|a| a.trim().to_string()).collect()
            }
            _ => Vec::new(),
        };
        Ok(Self {
            name: name.to_string(),
            args,
        })
    }
}

impl fmt::Display for ComponentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}={}", self.name, self.args.join(", "))
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DefinitionRepr {
    Shorthand(String),
    Table {
        name: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl TryFrom<DefinitionRepr> for ComponentDefinition {
    type Error = String;

    fn try_from(repr: DefinitionRepr) -> Result<Self, Self::Error> {
        match repr {
            DefinitionRepr::Shorthand(s) => s.parse(),
            DefinitionRepr::Table { name, args } => {
                if name.trim().is_empty() {
                    return Err("definition name must not be empty".to_string());
                }
                Ok(Self { name, args })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_shorthand_definition() {
        let def: ComponentDefinition = "AddRequestHeader=X-Trace, 1".parse().unwrap();
        assert_eq!(def.name, "AddRequestHeader");
        assert_eq!(def.args, vec!["X-Trace", "1"]);

        let bare: ComponentDefinition = "RouteToRequestUrl".parse().unwrap();
        assert!(bare.args.is_empty());

        assert!("=oops".parse::<ComponentDefinition>().is_err());
    }

    #[test]
    fn deserializes_mixed_route_definitions() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [gateway]
            global_filters = ["AddResponseHeader=X-Gateway, edge"]

            [[routes]]
            id = "users"
            uri = "http://users.internal:8080"
            predicates = [
                "Url=/api/**",
                { name = "Header", args = ["X-Version", "v(1|2),?"] },
            ]
            filters = ["RewritePath=/api/(?<seg>.*), /${seg}", "RouteToRequestUrl"]
            "#,
        )
        .unwrap();

        assert_eq!(config.gateway.global_filters.len(), 1);
        let route = &config.routes[0];
        assert_eq!(route.id, "users");
        assert_eq!(route.predicates[1].args, vec!["X-Version", "v(1|2),?"]);
        assert_eq!(route.filters[0].args, vec!["/api/(?<seg>.*)", "/${seg}"]);
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert!(config.timeouts.response_secs.is_none());
    }

    #[test]
    fn display_round_trips_shorthand() {
        let def = ComponentDefinition::new("SetStatus", ["201"]);
        assert_eq!(def.to_string(), "SetStatus=201");
        assert_eq!(def.to_string().parse::<ComponentDefinition>().unwrap(), def);
    }
}
