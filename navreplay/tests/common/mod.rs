//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use navreplay::directions::RoutesRequestCallback;
use navreplay::geo::Point;
use navreplay::route::{DirectionsRoute, RouteOptions, RouteSet};
use navreplay::router::{Router, RouterError, RouterFuture};

type Responder = oneshot::Sender<Result<RouteSet, RouterError>>;

/// Router whose responses are released by the test, in any order.
#[derive(Default)]
pub struct ScriptedRouter {
    calls: Mutex<Vec<(RouteOptions, Option<Responder>)>>,
}

impl ScriptedRouter {
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn options(&self, index: usize) -> RouteOptions {
        self.calls.lock()[index].0.clone()
    }

    /// Resolve call `index` with routes built from its own options.
    pub fn succeed(&self, index: usize, count: usize) {
        let options = self.options(index);
        self.respond(index, Ok(routes_for(&options, count)));
    }

    pub fn respond(&self, index: usize, result: Result<RouteSet, RouterError>) {
        let responder = self.calls.lock()[index].1.take().expect("already responded");
        let _ = responder.send(result);
    }
}

impl Router for ScriptedRouter {
    fn get_route(&self, options: RouteOptions) -> RouterFuture<RouteSet> {
        let (tx, rx) = oneshot::channel();
        self.calls.lock().push((options, Some(tx)));
        Box::pin(async move {
            rx.await
                .unwrap_or_else(|_| Err(RouterError::Network("responder dropped".into())))
        })
    }

    fn get_route_refresh(
        &self,
        route: DirectionsRoute,
        _leg_index: usize,
    ) -> RouterFuture<DirectionsRoute> {
        Box::pin(async move { Ok(route) })
    }
}

/// Options between two points with a distinguishing destination.
pub fn options_to(destination_lat: f64) -> RouteOptions {
    RouteOptions::builder()
        .coordinates(Point::new(52.52, 13.40), None, Point::new(destination_lat, 13.50))
        .build()
}

/// `count` routes that remember `options`.
pub fn routes_for(options: &RouteOptions, count: usize) -> RouteSet {
    (0..count)
        .map(|i| DirectionsRoute {
            route_index: i,
            distance: 1500.0 + i as f64,
            duration: 120.0,
            geometry: options.coordinates().to_vec(),
            leg_count: options.coordinates().len().saturating_sub(1),
            route_options: Some(options.clone()),
        })
        .collect::<Vec<_>>()
        .into()
}

/// Callback that counts each outcome kind.
#[derive(Default)]
pub struct CountingCallback {
    pub ready: AtomicUsize,
    pub failed: AtomicUsize,
    pub canceled: AtomicUsize,
}

impl CountingCallback {
    pub fn total(&self) -> usize {
        self.ready.load(Ordering::SeqCst)
            + self.failed.load(Ordering::SeqCst)
            + self.canceled.load(Ordering::SeqCst)
    }
}

impl RoutesRequestCallback for CountingCallback {
    fn on_routes_ready(&self, _routes: &RouteSet) {
        self.ready.fetch_add(1, Ordering::SeqCst);
    }

    fn on_routes_request_failure(&self, _error: &RouterError, _options: &RouteOptions) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    fn on_routes_request_canceled(&self, _options: &RouteOptions) {
        self.canceled.fetch_add(1, Ordering::SeqCst);
    }
}

/// Shared counter handy for observers.
pub fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}
