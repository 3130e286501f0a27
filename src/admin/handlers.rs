use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::admin::AdminState;
use crate::routing::Route;

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub routes: usize,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct RouteView {
    pub id: String,
    pub uri: String,
    pub predicates: Vec<String>,
    pub filters: Vec<String>,
}

impl From<&Route> for RouteView {
    fn from(route: &Route) -> Self {
        let definition = route.definition();
        Self {
            id: definition.id.clone(),
            uri: definition.uri.clone(),
            predicates: definition.predicates.iter().map(ToString::to_string).collect(),
            filters: definition.filters.iter().map(ToString::to_string).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FilterNames {
    pub available: Vec<String>,
    pub global: Vec<String>,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        routes: state.locator.snapshot().len(),
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

pub async fn get_routes(State(state): State<AdminState>) -> Json<Vec<RouteView>> {
    let table = state.locator.snapshot();
    let views = table
        .routes()
        .iter()
        .map(|r| RouteView::from(r.as_ref()))
        .collect();
    Json(views)
}

pub async fn get_route(
    State(state): State<AdminState>,
    Path(id): Path<String>,
) -> Result<Json<RouteView>, StatusCode> {
    let table = state.locator.snapshot();
    let route = table.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(RouteView::from(route.as_ref())))
}

pub async fn get_predicates(State(state): State<AdminState>) -> Json<Vec<String>> {
    Json(state.locator.predicates().names().map(String::from).collect())
}

pub async fn get_filters(State(state): State<AdminState>) -> Json<FilterNames> {
    Json(FilterNames {
        available: state.locator.filters().names().map(String::from).collect(),
        global: state.global_filters.to_vec(),
    })
}
