//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → routes handed to routing::RouteTable::build
//!
//! On reload (file change or SIGHUP):
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → routing builds a fresh RouteTable
//!     → atomic swap in the RouteLocator
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - A failed reload keeps the current route set

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use error::{ArgumentError, ConfigError};
pub use loader::{load_config, parse_config};
pub use schema::{
    AdminConfig, ComponentDefinition, GatewayConfig, GlobalConfig, ListenerConfig,
    ObservabilityConfig, RouteDefinition, RuntimeConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
pub use watcher::{ConfigWatcher, ReloadRequest};
