//! Integration tests for the route session.
//!
//! Run with: `cargo test --test route_session_integration`

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use proptest::prelude::*;

use navreplay::directions::{RouteRequestOutcome, RouteSession, RoutesObserver};
use navreplay::route::RouteSet;
use navreplay::router::RouterError;

use common::{counter, options_to, CountingCallback, ScriptedRouter};

// ============================================================================
// Ordering
// ============================================================================

/// Submit one request per entry, then answer them in `response_order`.
///
/// Returns the session's final routes, each request's outcome and the number
/// of observer notifications.
async fn run_overlapping_requests(
    response_order: &[usize],
) -> (RouteSet, Vec<RouteRequestOutcome>, usize) {
    let router = Arc::new(ScriptedRouter::default());
    let session = RouteSession::new(router.clone());
    let notifications = counter();
    let observer_count = Arc::clone(&notifications);
    session.register_routes_observer(Arc::new(move |_: &RouteSet| {
        observer_count.fetch_add(1, Ordering::SeqCst);
    }));

    let handles: Vec<_> = (0..response_order.len())
        .map(|i| session.request_routes(options_to(52.0 + i as f64 * 0.01), None))
        .collect();

    for &index in response_order {
        router.succeed(index, 1);
        tokio::task::yield_now().await;
    }

    let mut outcomes = Vec::with_capacity(handles.len());
    for handle in handles {
        outcomes.push(handle.outcome().await);
    }

    (
        session.routes(),
        outcomes,
        notifications.load(Ordering::SeqCst),
    )
}

proptest! {
    /// Whatever order responses arrive in, only the last submitted request
    /// sets the routes and every earlier one reports canceled.
    #[test]
    fn prop_last_submitted_request_wins(
        order in (1usize..6).prop_flat_map(|n| Just((0..n).collect::<Vec<usize>>()).prop_shuffle())
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let (routes, outcomes, notifications) =
            runtime.block_on(run_overlapping_requests(&order));

        let last = outcomes.len() - 1;
        for (i, outcome) in outcomes.iter().enumerate() {
            if i == last {
                prop_assert!(outcome.is_ready());
            } else {
                prop_assert!(outcome.is_canceled());
            }
        }

        let expected = options_to(52.0 + last as f64 * 0.01);
        let primary = routes.primary().and_then(|r| r.route_options()).unwrap();
        prop_assert_eq!(primary.destination(), expected.destination());
        prop_assert_eq!(notifications, 1);
    }
}

#[tokio::test]
async fn test_every_request_reports_exactly_once() {
    let router = Arc::new(ScriptedRouter::default());
    let session = RouteSession::new(router.clone());
    let callback = Arc::new(CountingCallback::default());

    let first = session.request_routes(options_to(52.0), Some(callback.clone()));
    let second = session.request_routes(options_to(52.1), Some(callback.clone()));
    let third = session.request_routes(options_to(52.2), Some(callback.clone()));

    router.respond(1, Err(RouterError::NoRoute("river".into())));
    router.respond(2, Err(RouterError::Network("offline".into())));
    router.succeed(0, 2);

    assert!(first.outcome().await.is_canceled());
    assert!(second.outcome().await.is_canceled());
    assert!(matches!(
        third.outcome().await,
        RouteRequestOutcome::Failed {
            error: RouterError::Network(_),
            ..
        }
    ));

    assert_eq!(callback.total(), 3);
    assert_eq!(callback.canceled.load(Ordering::SeqCst), 2);
    assert_eq!(callback.failed.load(Ordering::SeqCst), 1);
    assert!(session.routes().is_empty());
}

// ============================================================================
// Observers
// ============================================================================

struct Reentrant {
    session: RouteSession,
    seen: parking_lot::Mutex<Vec<usize>>,
}

impl RoutesObserver for Reentrant {
    fn on_routes_changed(&self, routes: &RouteSet) {
        self.seen.lock().push(routes.len());
        // Observers may read the session while being notified
        assert_eq!(self.session.routes().len(), routes.len());
    }
}

#[tokio::test]
async fn test_observer_can_reenter_session() {
    let router = Arc::new(ScriptedRouter::default());
    let session = RouteSession::new(router.clone());
    let observer = Arc::new(Reentrant {
        session: session.clone(),
        seen: parking_lot::Mutex::new(Vec::new()),
    });
    let id = session.register_routes_observer(observer.clone());

    let handle = session.request_routes(options_to(52.0), None);
    router.succeed(0, 3);
    assert!(handle.outcome().await.is_ready());

    session.set_routes(RouteSet::empty());
    assert_eq!(*observer.seen.lock(), vec![3, 0]);

    // The observer holds a session clone; break the cycle
    assert!(session.unregister_routes_observer(id));
}

#[tokio::test]
async fn test_shut_down_cancels_pending_work() {
    let router = Arc::new(ScriptedRouter::default());
    let session = RouteSession::new(router.clone());
    let callback = Arc::new(CountingCallback::default());

    let primary = session.request_routes(options_to(52.0), Some(callback.clone()));
    assert_eq!(session.pending_request_count(), 1);

    session.shut_down_session();
    assert!(primary.outcome().await.is_canceled());
    assert_eq!(callback.canceled.load(Ordering::SeqCst), 1);
    assert_eq!(session.pending_request_count(), 0);
}
