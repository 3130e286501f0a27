//! Read-only admin API.
//!
//! Exposes the active routes and the registered predicate/filter names.
//! There is no mutation path; routes change only through reload.

pub mod auth;
pub mod handlers;

use std::sync::Arc;
use std::time::Instant;

use axum::{middleware, routing::get, Router};

use crate::routing::RouteLocator;

use self::auth::admin_auth_middleware;
use self::handlers::*;

/// State shared by the admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub locator: Arc<RouteLocator>,
    /// Global filters as declared, for display.
    pub global_filters: Arc<[String]>,
    pub api_key: Arc<str>,
    pub started_at: Instant,
}

impl AdminState {
    pub fn new(locator: Arc<RouteLocator>, global_filters: Vec<String>, api_key: &str) -> Self {
        Self {
            locator,
            global_filters: global_filters.into(),
            api_key: api_key.into(),
            started_at: Instant::now(),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/routes", get(get_routes))
        .route("/admin/routes/{id}", get(get_route))
        .route("/admin/predicates", get(get_predicates))
        .route("/admin/filters", get(get_filters))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ))
        .with_state(state)
}
