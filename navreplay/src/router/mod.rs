//! Router collaborator contract.
//!
//! The routing backend is external. This module only fixes the shape of the
//! calls the route session makes against it:
//!
//! - `get_route(options)` resolves to a [`RouteSet`] or a [`RouterError`]
//! - `get_route_refresh(route, leg_index)` resolves to a refreshed route
//!
//! Cancellation is not part of the trait. The session owns every request
//! through a handle and drops the router future when the handle is cancelled,
//! so implementations must release their resources on drop.
//!
//! No timeout is imposed by the session. Implementations that need one should
//! apply it themselves and report expiry as [`RouterError::Timeout`].

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

use crate::route::{DirectionsRoute, RouteOptions, RouteSet};

/// Boxed future returned by router calls.
pub type RouterFuture<T> = Pin<Box<dyn Future<Output = Result<T, RouterError>> + Send + 'static>>;

/// Failures reported by a router.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RouterError {
    /// Transport failure talking to the backend.
    #[error("Network error: {0}")]
    Network(String),

    /// The backend found no route between the requested waypoints.
    #[error("No route found: {0}")]
    NoRoute(String),

    /// The backend rejected the request.
    #[error("Invalid route request: {0}")]
    InvalidRequest(String),

    /// The request exceeded the router's own deadline.
    #[error("Route request timed out after {0:?}")]
    Timeout(Duration),

    /// Leg index outside the route passed to a refresh call.
    #[error("Leg index {index} out of range for route with {legs} legs")]
    InvalidLeg { index: usize, legs: usize },
}

/// Asynchronous routing backend.
pub trait Router: Send + Sync + 'static {
    /// Fetch routes for the given options.
    fn get_route(&self, options: RouteOptions) -> RouterFuture<RouteSet>;

    /// Refresh annotations of a route from the given leg onwards.
    fn get_route_refresh(
        &self,
        route: DirectionsRoute,
        leg_index: usize,
    ) -> RouterFuture<DirectionsRoute>;
}
