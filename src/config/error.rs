//! Configuration-time errors.
//!
//! Everything here is raised while loading or building the route set and is
//! fatal for that load. None of it is observable per request.

use thiserror::Error;

use crate::config::validation::ValidationError;

/// Error type for configuration loading and route building.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("route '{route}': unknown predicate '{name}'")]
    UnknownPredicate { route: String, name: String },

    #[error("{scope}: unknown filter '{name}'")]
    UnknownFilter { scope: String, name: String },

    #[error("{scope}: invalid arguments for '{component}': {source}")]
    InvalidArguments {
        scope: String,
        component: String,
        #[source]
        source: ArgumentError,
    },

    #[error("route '{route}': invalid target '{uri}': {reason}")]
    InvalidTarget {
        route: String,
        uri: String,
        reason: String,
    },

    #[error("duplicate route id '{0}'")]
    DuplicateRouteId(String),
}

/// Rejection of a predicate or filter's arguments by its factory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ArgumentError(pub String);

impl ArgumentError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }

    /// Reject an argument list whose length is outside `min..=max`.
    pub fn check_arity(args: &[String], min: usize, max: usize) -> Result<(), Self> {
        if args.len() < min || args.len() > max {
            let expected = if min == max {
                format!("{}", min)
            } else {
                format!("{}..={}", min, max)
            };
            return Err(Self(format!(
                "expected {} argument(s), got {}",
                expected,
                args.len()
            )));
        }
        Ok(())
    }
}

impl From<regex::Error> for ArgumentError {
    fn from(err: regex::Error) -> Self {
        Self(format!("invalid regex: {}", err))
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
