//! Filter factory registry.
//!
//! Maps filter names used in route definitions and global filters to
//! factories. Built once at startup and passed by reference to whatever
//! builds chains.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::config::{ArgumentError, ComponentDefinition, ConfigError};
use crate::filter::builtin::{
    AddRequestHeader, AddResponseHeader, RedirectTo, RemoveRequestHeader, RemoveResponseHeader,
    RewritePath, SetPath, SetResponseHeader, SetStatus,
};
use crate::filter::chain::GatewayFilter;
use crate::filter::url::RouteToRequestUrl;

/// Builds a filter from its configured arguments.
pub trait FilterFactory: Send + Sync {
    fn create(&self, args: &[String]) -> Result<Arc<dyn GatewayFilter>, ArgumentError>;
}

impl<F> FilterFactory for F
where
    F: Fn(&[String]) -> Result<Arc<dyn GatewayFilter>, ArgumentError> + Send + Sync,
{
    fn create(&self, args: &[String]) -> Result<Arc<dyn GatewayFilter>, ArgumentError> {
        self(args)
    }
}

/// Immutable name → factory mapping for filters.
#[derive(Clone, Default)]
pub struct FilterRegistry {
    factories: BTreeMap<String, Arc<dyn FilterFactory>>,
}

impl FilterRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry with every built-in filter.
    pub fn with_builtins() -> Self {
        Self::empty()
            .register("AddRequestHeader", builtin(AddRequestHeader::from_args))
            .register("AddResponseHeader", builtin(AddResponseHeader::from_args))
            .register("RedirectTo", builtin(RedirectTo::from_args))
            .register("RemoveRequestHeader", builtin(RemoveRequestHeader::from_args))
            .register("RemoveResponseHeader", builtin(RemoveResponseHeader::from_args))
            .register("RewritePath", builtin(RewritePath::from_args))
            .register("RouteToRequestUrl", builtin(RouteToRequestUrl::from_args))
            .register("SetPath", builtin(SetPath::from_args))
            .register("SetResponseHeader", builtin(SetResponseHeader::from_args))
            .register("SetStatus", builtin(SetStatus::from_args))
    }

    /// Add or replace the factory for `name`.
    pub fn register(mut self, name: impl Into<String>, factory: impl FilterFactory + 'static) -> Self {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn FilterFactory> {
        self.factories.get(name).map(|f| f.as_ref())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Build filters for `definitions` in order. `scope` names the owner
    /// (a route or the global filter list) in errors.
    pub fn build_all(
        &self,
        scope: &str,
        definitions: &[ComponentDefinition],
    ) -> Result<Vec<Arc<dyn GatewayFilter>>, ConfigError> {
        definitions
            .iter()
            .map(|def| {
                let factory = self.get(&def.name).ok_or_else(|| ConfigError::UnknownFilter {
                    scope: scope.to_string(),
                    name: def.name.clone(),
                })?;
                factory
                    .create(&def.args)
                    .map_err(|source| ConfigError::InvalidArguments {
                        scope: scope.to_string(),
                        component: def.name.clone(),
                        source,
                    })
            })
            .collect()
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("names", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn builtin<G>(build: fn(&[String]) -> Result<G, ArgumentError>) -> impl FilterFactory + 'static
where
    G: GatewayFilter + 'static,
{
    move |args: &[String]| -> Result<Arc<dyn GatewayFilter>, ArgumentError> { Ok(Arc::new(build(args)?)) }
}
