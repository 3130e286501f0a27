//! Route sets and their atomic replacement.
//!
//! # Responsibilities
//! - Build an immutable `RouteTable` from route definitions
//! - Hold the active table behind an atomic pointer
//! - Re-query the route source on reload and swap the table wholesale
//!
//! # Design Decisions
//! - A request works on the snapshot it loaded; a concurrent reload never
//!   changes the routes it sees
//! - A failed reload keeps the current table
//! - Registries are fixed for the lifetime of the locator

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::{load_config, ConfigError, RouteDefinition};
use crate::filter::FilterRegistry;
use crate::http::Exchange;
use crate::observability::metrics;
use crate::routing::matcher::{find_route, RouteMatch};
use crate::routing::registry::PredicateRegistry;
use crate::routing::route::{Route, TargetTemplate};

/// Supplies the ordered route definitions.
pub trait RouteSource: Send + Sync {
    fn load(&self) -> Result<Vec<RouteDefinition>, ConfigError>;
}

/// A fixed, in-memory list of routes.
#[derive(Debug, Clone, Default)]
pub struct StaticRouteSource {
    routes: Vec<RouteDefinition>,
}

impl StaticRouteSource {
    pub fn new(routes: Vec<RouteDefinition>) -> Self {
        Self { routes }
    }
}

impl RouteSource for StaticRouteSource {
    fn load(&self) -> Result<Vec<RouteDefinition>, ConfigError> {
        Ok(self.routes.clone())
    }
}

/// Reads `[[routes]]` from the config file on every load.
#[derive(Debug, Clone)]
pub struct FileRouteSource {
    path: PathBuf,
}

impl FileRouteSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RouteSource for FileRouteSource {
    fn load(&self) -> Result<Vec<RouteDefinition>, ConfigError> {
        Ok(load_config(&self.path)?.routes)
    }
}

/// An immutable, ordered set of compiled routes.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Arc<Route>>,
}

impl RouteTable {
    /// Compile `definitions` in order. Unknown names, malformed arguments,
    /// bad targets and duplicate ids are all rejected.
    pub fn build(
        definitions: Vec<RouteDefinition>,
        predicates: &PredicateRegistry,
        filters: &FilterRegistry,
    ) -> Result<Self, ConfigError> {
        let mut routes: Vec<Arc<Route>> = Vec::with_capacity(definitions.len());
        for definition in definitions {
            if routes.iter().any(|r| r.id() == definition.id) {
                return Err(ConfigError::DuplicateRouteId(definition.id));
            }
            routes.push(Arc::new(build_route(definition, predicates, filters)?));
        }
        Ok(Self { routes })
    }

    /// First route accepting `exchange`, in declaration order.
    pub fn lookup(&self, exchange: &Exchange) -> Option<RouteMatch> {
        find_route(&self.routes, exchange)
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Route>> {
        self.routes.iter().find(|r| r.id() == id)
    }

    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

fn build_route(
    definition: RouteDefinition,
    predicates: &PredicateRegistry,
    filters: &FilterRegistry,
) -> Result<Route, ConfigError> {
    let scope = format!("route '{}'", definition.id);

    let target =
        TargetTemplate::parse(&definition.uri).map_err(|reason| ConfigError::InvalidTarget {
            route: definition.id.clone(),
            uri: definition.uri.clone(),
            reason,
        })?;

    let built_predicates = definition
        .predicates
        .iter()
        .map(|def| {
            let factory = predicates
                .get(&def.name)
                .ok_or_else(|| ConfigError::UnknownPredicate {
                    route: definition.id.clone(),
                    name: def.name.clone(),
                })?;
            factory
                .create(&def.args)
                .map_err(|source| ConfigError::InvalidArguments {
                    scope: scope.clone(),
                    component: def.name.clone(),
                    source,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let built_filters = filters.build_all(&scope, &definition.filters)?;

    Ok(Route::new(definition, target, built_predicates, built_filters))
}

/// The active route table plus the registries used to rebuild it.
pub struct RouteLocator {
    table: ArcSwap<RouteTable>,
    predicates: PredicateRegistry,
    filters: FilterRegistry,
}

impl RouteLocator {
    pub fn new(table: RouteTable, predicates: PredicateRegistry, filters: FilterRegistry) -> Self {
        Self {
            table: ArcSwap::from_pointee(table),
            predicates,
            filters,
        }
    }

    /// Build the initial table from `source`.
    pub fn from_source(
        source: &dyn RouteSource,
        predicates: PredicateRegistry,
        filters: FilterRegistry,
    ) -> Result<Self, ConfigError> {
        let table = RouteTable::build(source.load()?, &predicates, &filters)?;
        tracing::info!(routes = table.len(), "Route table built");
        Ok(Self::new(table, predicates, filters))
    }

    /// The table as of now. Holding it pins that version.
    pub fn snapshot(&self) -> Arc<RouteTable> {
        self.table.load_full()
    }

    pub fn replace(&self, table: RouteTable) {
        self.table.store(Arc::new(table));
    }

    /// Rebuild from `source` and swap. Returns the new route count.
    pub fn reload(&self, source: &dyn RouteSource) -> Result<usize, ConfigError> {
        let result = source
            .load()
            .and_then(|defs| RouteTable::build(defs, &self.predicates, &self.filters));

        match result {
            Ok(table) => {
                let count = table.len();
                self.replace(table);
                metrics::record_route_reload(true);
                tracing::info!(routes = count, "Route table reloaded");
                Ok(count)
            }
            Err(e) => {
                metrics::record_route_reload(false);
                tracing::error!(error = %e, "Route reload failed, keeping current routes");
                Err(e)
            }
        }
    }

    pub fn predicates(&self) -> &PredicateRegistry {
        &self.predicates
    }

    pub fn filters(&self) -> &FilterRegistry {
        &self.filters
    }
}

impl std::fmt::Debug for RouteLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteLocator")
            .field("routes", &self.table.load().len())
            .field("predicates", &self.predicates)
            .field("filters", &self.filters)
            .finish()
    }
}
