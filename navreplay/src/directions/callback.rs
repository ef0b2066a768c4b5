//! Listener traits for route session results.

use crate::route::{DirectionsRoute, RouteOptions, RouteSet};
use crate::router::RouterError;

/// Notified whenever the session's current route set changes.
///
/// Called synchronously, in registration order, once per change.
pub trait RoutesObserver: Send + Sync {
    /// The current route set was replaced.
    fn on_routes_changed(&self, routes: &RouteSet);
}

impl<F> RoutesObserver for F
where
    F: Fn(&RouteSet) + Send + Sync,
{
    fn on_routes_changed(&self, routes: &RouteSet) {
        self(routes)
    }
}

/// Receives the outcome of one route request.
///
/// Exactly one method is called per request.
pub trait RoutesRequestCallback: Send + Sync {
    /// The router returned routes.
    fn on_routes_ready(&self, routes: &RouteSet);

    /// The router reported a failure.
    fn on_routes_request_failure(&self, error: &RouterError, options: &RouteOptions);

    /// The request was superseded, explicitly cancelled, or not issued.
    fn on_routes_request_canceled(&self, options: &RouteOptions);
}

/// Receives the outcome of a route refresh.
///
/// Cancelled refreshes are dropped without a call.
pub trait RouteRefreshCallback: Send + Sync {
    /// The router returned a refreshed route.
    fn on_refresh(&self, route: &DirectionsRoute);

    /// The refresh failed.
    fn on_error(&self, error: &RouterError);
}
