//! Route session: the authoritative owner of the current route set.
//!
//! # Request Tracking
//!
//! ```text
//! request_routes ──► primary slot (at most one) ──► Router::get_route
//!                       │ superseded: token cancelled, callback sees canceled
//!                       ▼
//!                 complete_primary ──► replace route set ──► callback ──► observers
//!
//! request_faster_route ──► pending probes (any number) ──► callback only
//! ```
//!
//! Every router call runs in its own task racing the router future against
//! the request's cancellation token. The task is the only place a request's
//! callback fires, so each request reports exactly once.
//!
//! # Ordering
//!
//! The last submitted primary request wins. A response that arrives after its
//! request was superseded is reported as cancelled and never touches the
//! route set.
//!
//! # Locking
//!
//! `state` guards the route set, remembered options, pending requests and
//! observers. `fanout` serializes "replace then notify" sequences so observers
//! never see two updates interleaved. It is reentrant so listeners may call
//! back into the session. Lock order is always `fanout` then `state`, and
//! `state` is never held while user code runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::callback::{RouteRefreshCallback, RoutesObserver, RoutesRequestCallback};
use super::request::{RequestId, RouteRequestHandle, RouteRequestOutcome};
use crate::observer::{ObserverId, ObserverList};
use crate::route::{DirectionsRoute, RouteOptions, RouteSet};
use crate::router::{Router, RouterError};

/// The primary request currently allowed to set routes.
#[derive(Debug)]
struct PrimaryRequest {
    id: RequestId,
    token: CancellationToken,
}

struct SessionState {
    routes: RouteSet,
    route_options: Option<RouteOptions>,
    primary: Option<PrimaryRequest>,
    /// Faster-route probes and refreshes.
    side_requests: HashMap<RequestId, CancellationToken>,
    observers: ObserverList<dyn RoutesObserver>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            routes: RouteSet::empty(),
            route_options: None,
            primary: None,
            side_requests: HashMap::new(),
            observers: ObserverList::new(),
        }
    }

    /// Cancel every outstanding router operation. Returns how many were cancelled.
    fn cancel_pending(&mut self) -> usize {
        let mut cancelled = 0;
        if let Some(primary) = self.primary.take() {
            primary.token.cancel();
            cancelled += 1;
        }
        for (_, token) in self.side_requests.drain() {
            token.cancel();
            cancelled += 1;
        }
        cancelled
    }

    fn is_current_primary(&self, id: RequestId) -> bool {
        self.primary.as_ref().is_some_and(|p| p.id == id)
    }

    /// Apply the atomic replace rule.
    ///
    /// Returns the observers to notify, or `None` for the empty-to-empty no-op.
    fn replace_routes(
        &mut self,
        routes: &RouteSet,
    ) -> Option<Vec<(ObserverId, Arc<dyn RoutesObserver>)>> {
        if self.routes.is_empty() && routes.is_empty() {
            return None;
        }
        self.routes = routes.clone();
        if let Some(primary) = routes.primary() {
            self.route_options = primary.route_options().cloned();
        }
        Some(self.observers.snapshot())
    }
}

struct SessionInner {
    router: Arc<dyn Router>,
    runtime: Handle,
    state: Mutex<SessionState>,
    fanout: ReentrantMutex<()>,
    next_request_id: AtomicU64,
}

impl SessionInner {
    fn next_id(&self) -> RequestId {
        RequestId(self.next_request_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Deliver a route set to a snapshot of observers.
    ///
    /// Observers removed since the snapshot was taken are skipped.
    fn notify(&self, observers: Vec<(ObserverId, Arc<dyn RoutesObserver>)>, routes: &RouteSet) {
        for (id, observer) in observers {
            if !self.state.lock().observers.contains(id) {
                continue;
            }
            observer.on_routes_changed(routes);
        }
    }

    fn set_routes(&self, routes: RouteSet) {
        let _fanout = self.fanout.lock();
        let observers = {
            let mut state = self.state.lock();
            let cancelled = state.cancel_pending();
            if cancelled > 0 {
                debug!(cancelled, "Cancelled pending router operations before route replace");
            }
            state.replace_routes(&routes)
        };

        match observers {
            Some(observers) => {
                debug!(routes = routes.len(), observers = observers.len(), "Routes changed");
                self.notify(observers, &routes);
            }
            None => debug!("Empty route set assigned over empty route set, skipping"),
        }
    }

    fn complete_primary(
        &self,
        id: RequestId,
        token: &CancellationToken,
        result: Option<Result<RouteSet, RouterError>>,
        options: RouteOptions,
        callback: Option<&dyn RoutesRequestCallback>,
    ) -> RouteRequestOutcome {
        let _fanout = self.fanout.lock();
        let mut state = self.state.lock();
        let current = state.is_current_primary(id) && !token.is_cancelled();

        match result {
            Some(Ok(routes)) if current => {
                state.primary = None;
                state.cancel_pending();
                let observers = state.replace_routes(&routes);
                drop(state);

                debug!(request_id = %id, routes = routes.len(), "Router returned route(s)");
                if let Some(callback) = callback {
                    callback.on_routes_ready(&routes);
                }
                if let Some(observers) = observers {
                    self.notify(observers, &routes);
                }
                RouteRequestOutcome::Ready(routes)
            }
            Some(Err(error)) if current => {
                state.primary = None;
                drop(state);

                debug!(request_id = %id, error = %error, "Route request failed");
                if let Some(callback) = callback {
                    callback.on_routes_request_failure(&error, &options);
                }
                RouteRequestOutcome::Failed { error, options }
            }
            _ => {
                if state.is_current_primary(id) {
                    state.primary = None;
                }
                drop(state);

                debug!(request_id = %id, "Route request was canceled");
                if let Some(callback) = callback {
                    callback.on_routes_request_canceled(&options);
                }
                RouteRequestOutcome::Canceled { options }
            }
        }
    }

    fn complete_probe(
        &self,
        id: RequestId,
        token: &CancellationToken,
        result: Option<Result<RouteSet, RouterError>>,
        adjusted: RouteOptions,
        callback: Option<&dyn RoutesRequestCallback>,
    ) -> RouteRequestOutcome {
        // Failures and cancellations report the active route's options.
        let reported = {
            let mut state = self.state.lock();
            state.side_requests.remove(&id);
            state.route_options.clone().unwrap_or(adjusted)
        };

        match result {
            Some(Ok(routes)) if !token.is_cancelled() => {
                debug!(request_id = %id, routes = routes.len(), "Faster route probe returned");
                if let Some(callback) = callback {
                    callback.on_routes_ready(&routes);
                }
                RouteRequestOutcome::Ready(routes)
            }
            Some(Err(error)) if !token.is_cancelled() => {
                debug!(request_id = %id, error = %error, "Faster route probe failed");
                if let Some(callback) = callback {
                    callback.on_routes_request_failure(&error, &reported);
                }
                RouteRequestOutcome::Failed {
                    error,
                    options: reported,
                }
            }
            _ => {
                debug!(request_id = %id, "Faster route probe was canceled");
                if let Some(callback) = callback {
                    callback.on_routes_request_canceled(&reported);
                }
                RouteRequestOutcome::Canceled { options: reported }
            }
        }
    }
}

/// Owns the current route set and the router requests that produce it.
///
/// Cloning yields another handle to the same session.
///
/// # Example
///
/// ```ignore
/// use navreplay::directions::RouteSession;
///
/// let session = RouteSession::new(router);
/// session.register_routes_observer(Arc::new(|routes: &RouteSet| {
///     println!("{} route(s)", routes.len());
/// }));
///
/// let handle = session.request_routes(options, None);
/// let outcome = handle.outcome().await;
/// ```
#[derive(Clone)]
pub struct RouteSession {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for RouteSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("RouteSession")
            .field("routes", &state.routes.len())
            .field("primary", &state.primary)
            .field("side_requests", &state.side_requests.len())
            .field("observers", &state.observers.len())
            .finish()
    }
}

impl RouteSession {
    /// Create a session that runs router calls on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn new(router: Arc<dyn Router>) -> Self {
        Self::with_runtime(router, Handle::current())
    }

    /// Create a session that runs router calls on the given runtime.
    pub fn with_runtime(router: Arc<dyn Router>, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                router,
                runtime,
                state: Mutex::new(SessionState::new()),
                fanout: ReentrantMutex::new(()),
                next_request_id: AtomicU64::new(1),
            }),
        }
    }

    /// Snapshot of the current route set.
    pub fn routes(&self) -> RouteSet {
        self.inner.state.lock().routes.clone()
    }

    /// Options of the current primary route, if one was ever set.
    pub fn route_options(&self) -> Option<RouteOptions> {
        self.inner.state.lock().route_options.clone()
    }

    /// Replace the current route set.
    ///
    /// Cancels any pending router operation first. Assigning an empty set
    /// while the current set is empty does nothing else; any other
    /// assignment notifies every observer with the new set.
    pub fn set_routes(&self, routes: impl Into<RouteSet>) {
        self.inner.set_routes(routes.into());
    }

    /// Issue a primary route request, superseding any previous one.
    ///
    /// On success the returned routes become the current route set before the
    /// callback fires, then observers are notified. Failures and
    /// cancellations leave the route set untouched.
    pub fn request_routes(
        &self,
        options: RouteOptions,
        callback: Option<Arc<dyn RoutesRequestCallback>>,
    ) -> RouteRequestHandle {
        let id = self.inner.next_id();
        let token = CancellationToken::new();

        {
            let mut state = self.inner.state.lock();
            let previous = state.primary.replace(PrimaryRequest {
                id,
                token: token.clone(),
            });
            if let Some(previous) = previous {
                debug!(
                    superseded = %previous.id,
                    request_id = %id,
                    "Superseding in-flight route request"
                );
                previous.token.cancel();
            }
        }

        debug!(request_id = %id, waypoints = options.coordinates().len(), "Requesting routes");
        let future = self.inner.router.get_route(options.clone());
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let inner = Arc::clone(&self.inner);
        let task_token = token.clone();
        let task_options = options.clone();

        self.inner.runtime.spawn(async move {
            let result = tokio::select! {
                biased;
                _ = task_token.cancelled() => None,
                result = future => Some(result),
            };
            let outcome = inner.complete_primary(
                id,
                &task_token,
                result,
                task_options,
                callback.as_deref(),
            );
            let _ = outcome_tx.send(outcome);
        });

        RouteRequestHandle::new(id, token, options, outcome_rx)
    }

    /// Probe for a faster route without committing it.
    ///
    /// Requires a non-empty current route set; otherwise the callback is told
    /// the request was cancelled (with `adjusted_options`) and the router is
    /// not called. A successful probe is forwarded but does not replace the
    /// current route set. Failures and cancellations are reported with the
    /// options of the active primary route, not the probe's options.
    pub fn request_faster_route(
        &self,
        adjusted_options: RouteOptions,
        callback: Option<Arc<dyn RoutesRequestCallback>>,
    ) -> RouteRequestHandle {
        let id = self.inner.next_id();
        let token = CancellationToken::new();

        {
            let mut state = self.inner.state.lock();
            if state.routes.is_empty() {
                drop(state);
                debug!(request_id = %id, "No active route, faster route probe not issued");
                if let Some(callback) = callback {
                    callback.on_routes_request_canceled(&adjusted_options);
                }
                let outcome = RouteRequestOutcome::Canceled {
                    options: adjusted_options.clone(),
                };
                return RouteRequestHandle::resolved(id, adjusted_options, outcome);
            }
            state.side_requests.insert(id, token.clone());
        }

        debug!(request_id = %id, "Requesting faster route");
        let future = self.inner.router.get_route(adjusted_options.clone());
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let inner = Arc::clone(&self.inner);
        let task_token = token.clone();
        let task_options = adjusted_options.clone();

        self.inner.runtime.spawn(async move {
            let result = tokio::select! {
                biased;
                _ = task_token.cancelled() => None,
                result = future => Some(result),
            };
            let outcome =
                inner.complete_probe(id, &task_token, result, task_options, callback.as_deref());
            let _ = outcome_tx.send(outcome);
        });

        RouteRequestHandle::new(id, token, adjusted_options, outcome_rx)
    }

    /// Refresh a route from the given leg onwards.
    ///
    /// The refreshed route is handed to the callback only; the current route
    /// set is not modified. Cancelled refreshes report nothing.
    pub fn request_route_refresh(
        &self,
        route: DirectionsRoute,
        leg_index: usize,
        callback: Arc<dyn RouteRefreshCallback>,
    ) -> RequestId {
        let id = self.inner.next_id();

        if leg_index >= route.leg_count {
            callback.on_error(&RouterError::InvalidLeg {
                index: leg_index,
                legs: route.leg_count,
            });
            return id;
        }

        let token = CancellationToken::new();
        self.inner
            .state
            .lock()
            .side_requests
            .insert(id, token.clone());

        debug!(request_id = %id, leg_index, "Requesting route refresh");
        let future = self.inner.router.get_route_refresh(route, leg_index);
        let inner = Arc::clone(&self.inner);

        self.inner.runtime.spawn(async move {
            let result = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                result = future => Some(result),
            };
            inner.state.lock().side_requests.remove(&id);

            match result {
                Some(Ok(route)) if !token.is_cancelled() => callback.on_refresh(&route),
                Some(Err(error)) if !token.is_cancelled() => callback.on_error(&error),
                _ => debug!(request_id = %id, "Route refresh was canceled"),
            }
        });

        id
    }

    /// Register an observer.
    ///
    /// If a route is already established the observer is called once
    /// immediately with the current set.
    pub fn register_routes_observer(&self, observer: Arc<dyn RoutesObserver>) -> ObserverId {
        let _fanout = self.inner.fanout.lock();
        let (id, current) = {
            let mut state = self.inner.state.lock();
            let id = state.observers.add(Arc::clone(&observer));
            let current = (!state.routes.is_empty()).then(|| state.routes.clone());
            (id, current)
        };

        if let Some(routes) = current {
            observer.on_routes_changed(&routes);
        }
        id
    }

    /// Remove one observer. Returns false if it was not registered.
    pub fn unregister_routes_observer(&self, id: ObserverId) -> bool {
        self.inner.state.lock().observers.remove(id)
    }

    /// Remove every observer.
    pub fn unregister_all_routes_observers(&self) {
        self.inner.state.lock().observers.clear();
    }

    /// Number of registered observers.
    pub fn routes_observer_count(&self) -> usize {
        self.inner.state.lock().observers.len()
    }

    /// Number of router operations still in flight.
    pub fn pending_request_count(&self) -> usize {
        let state = self.inner.state.lock();
        state.side_requests.len() + usize::from(state.primary.is_some())
    }

    /// Cancel every in-flight router operation. The route set is kept.
    pub fn cancel(&self) {
        let cancelled = self.inner.state.lock().cancel_pending();
        debug!(cancelled, "Route session cancelled pending requests");
    }

    /// Tear down in-flight work.
    ///
    /// Equivalent to [`cancel`](Self::cancel). Observers stay registered; the
    /// owner removes them with
    /// [`unregister_all_routes_observers`](Self::unregister_all_routes_observers).
    pub fn shut_down_session(&self) {
        self.cancel();
        info!("Route session shut down");
    }
}
