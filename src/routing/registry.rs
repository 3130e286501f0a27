//! Predicate factory registry.
//!
//! Maps predicate names used in route definitions to factories that build
//! predicates from string arguments. Built once at startup and shared
//! read-only; there is no global registry.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::config::ArgumentError;
use crate::routing::predicate::{
    CookiePredicate, HeaderPredicate, HostPredicate, MethodPredicate, PathPredicate, Predicate,
    QueryPredicate,
};

/// Builds a predicate from its configured arguments.
pub trait PredicateFactory: Send + Sync {
    fn create(&self, args: &[String]) -> Result<Arc<dyn Predicate>, ArgumentError>;
}

impl<F> PredicateFactory for F
where
    F: Fn(&[String]) -> Result<Arc<dyn Predicate>, ArgumentError> + Send + Sync,
{
    fn create(&self, args: &[String]) -> Result<Arc<dyn Predicate>, ArgumentError> {
        self(args)
    }
}

/// Immutable name → factory mapping for predicates.
#[derive(Clone, Default)]
pub struct PredicateRegistry {
    factories: BTreeMap<String, Arc<dyn PredicateFactory>>,
}

impl PredicateRegistry {
    /// A registry with no predicates.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry with every built-in predicate.
    pub fn with_builtins() -> Self {
        Self::empty()
            .register("Cookie", builtin(CookiePredicate::from_args))
            .register("Header", builtin(HeaderPredicate::from_args))
            .register("Host", builtin(HostPredicate::from_args))
            .register("Method", builtin(MethodPredicate::from_args))
            .register("Query", builtin(QueryPredicate::from_args))
            .register("Url", builtin(PathPredicate::from_args))
            .register("Path", builtin(PathPredicate::from_args))
    }

    /// Add or replace the factory for `name`.
    pub fn register(mut self, name: impl Into<String>, factory: impl PredicateFactory + 'static) -> Self {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn PredicateFactory> {
        self.factories.get(name).map(|f| f.as_ref())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl fmt::Debug for PredicateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateRegistry")
            .field("names", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn builtin<P>(
    build: fn(&[String]) -> Result<P, ArgumentError>,
) -> impl PredicateFactory + 'static
where
    P: Predicate + 'static,
{
    move |args: &[String]| -> Result<Arc<dyn Predicate>, ArgumentError> { Ok(Arc::new(build(args)?)) }
}
