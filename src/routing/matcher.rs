//! Route matching logic.
//!
//! # Responsibilities
//! - Walk routes in declaration order
//! - Evaluate each route's predicates with AND semantics
//! - Return the first full match with its captured variables, or nothing
//!
//! # Design Decisions
//! - First match wins; there is no specificity ranking
//! - Predicates short-circuit on the first failure
//! - Captures from rejected routes are discarded
//! - No match is an outcome, not an error

use std::sync::Arc;

use crate::http::{Exchange, UriVariables};
use crate::routing::route::Route;

/// The selected route and the variables its predicates captured.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<Route>,
    pub variables: UriVariables,
}

/// Find the first route whose predicates all accept `exchange`.
pub fn find_route(routes: &[Arc<Route>], exchange: &Exchange) -> Option<RouteMatch> {
    let mut captures = UriVariables::new();
    for route in routes {
        captures.clear();
        if route.matches(exchange, &mut captures) {
            tracing::debug!(route = route.id(), path = exchange.path(), "Route matched");
            return Some(RouteMatch {
                route: Arc::clone(route),
                variables: captures,
            });
        }
        tracing::trace!(route = route.id(), "Route rejected");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteDefinition;
    use crate::routing::predicate::{PathPredicate, Predicate};
    use crate::routing::TargetTemplate;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a fixed answer and counts evaluations.
    #[derive(Debug)]
    struct Fixed {
        answer: bool,
        calls: Arc<AtomicUsize>,
    }

    impl Predicate for Fixed {
        fn test(&self, _: &Exchange, captures: &mut UriVariables) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            captures.insert("seen".to_string(), self.answer.to_string());
            self.answer
        }
    }

    fn route(id: &str, predicates: Vec<Arc<dyn Predicate>>) -> Arc<Route> {
        let definition = RouteDefinition {
            id: id.to_string(),
            uri: "http://backend:8080".to_string(),
            predicates: Vec::new(),
            filters: Vec::new(),
        };
        let target = TargetTemplate::parse(&definition.uri).unwrap();
        Arc::new(Route::new(definition, target, predicates, Vec::new()))
    }

    fn path(pattern: &str) -> Arc<dyn Predicate> {
        Arc::new(PathPredicate::new(pattern).unwrap())
    }

    fn exchange(uri: &str) -> Exchange {
        Exchange::new(Request::builder().uri(uri).body(Body::empty()).unwrap())
    }

    #[test]
    fn random_predicate_sets_are_anded_with_short_circuit() {
        let ex = exchange("/");
        for _ in 0..200 {
            let answers: Vec<bool> = (0..fastrand::usize(0..8)).map(|_| fastrand::bool()).collect();
            let calls = Arc::new(AtomicUsize::new(0));
            let predicates = answers
                .iter()
                .map(|&answer| {
                    Arc::new(Fixed {
                        answer,
                        calls: calls.clone(),
                    }) as Arc<dyn Predicate>
                })
                .collect();
            let routes = vec![route("r", predicates)];

            let expected = answers.iter().all(|&a| a);
            let expected_calls = answers
                .iter()
                .position(|&a| !a)
                .map(|i| i + 1)
                .unwrap_or(answers.len());

            assert_eq!(find_route(&routes, &ex).is_some(), expected, "answers {:?}", answers);
            assert_eq!(calls.load(Ordering::SeqCst), expected_calls, "answers {:?}", answers);
        }
    }

    #[test]
    fn first_declared_match_wins() {
        let routes = vec![
            route("users", vec![path("/api/users/**")]),
            route("api", vec![path("/api/**")]),
            route("also-users", vec![path("/api/users/{id}")]),
        ];

        for _ in 0..50 {
            let found = find_route(&routes, &exchange("/api/users/42")).unwrap();
            assert_eq!(found.route.id(), "users");
        }
        let found = find_route(&routes, &exchange("/api/orders")).unwrap();
        assert_eq!(found.route.id(), "api");
    }

    #[test]
    fn unmatched_path_yields_none() {
        let routes = vec![route("api", vec![path("/api/**")])];
        assert!(find_route(&routes, &exchange("/unconfigured")).is_none());
        assert!(find_route(&[], &exchange("/api")).is_none());
    }

    #[test]
    fn captures_come_from_the_selected_route_only() {
        let calls = Arc::new(AtomicUsize::new(0));
        let rejected: Arc<dyn Predicate> = Arc::new(Fixed {
            answer: false,
            calls: calls.clone(),
        });
        let routes = vec![
            route("rejected", vec![rejected]),
            route("items", vec![path("/items/{id}")]),
        ];

        let found = find_route(&routes, &exchange("/items/9")).unwrap();
        assert_eq!(found.route.id(), "items");
        assert_eq!(found.variables.get("id").map(String::as_str), Some("9"));
        assert!(!found.variables.contains_key("seen"));
    }

    #[test]
    fn route_without_predicates_matches_everything() {
        let routes = vec![route("catch-all", Vec::new())];
        assert!(find_route(&routes, &exchange("/anything")).is_some());
    }
}
