//! Directions session: route requests and the current route set.
//!
//! [`RouteSession`] is the single owner of the active routes. It issues
//! requests against a [`Router`](crate::router::Router), guarantees that only
//! the most recently submitted primary request can change the route set, and
//! notifies [`RoutesObserver`]s on every change.
//!
//! # Example
//!
//! ```ignore
//! use navreplay::directions::{RouteSession, RouteRequestOutcome};
//!
//! let session = RouteSession::new(router);
//! let handle = session.request_routes(options, Some(callback));
//!
//! match handle.outcome().await {
//!     RouteRequestOutcome::Ready(routes) => println!("{} route(s)", routes.len()),
//!     RouteRequestOutcome::Failed { error, .. } => eprintln!("{}", error),
//!     RouteRequestOutcome::Canceled { .. } => {}
//! }
//! ```

mod callback;
mod request;
mod session;

pub use callback::{RouteRefreshCallback, RoutesObserver, RoutesRequestCallback};
pub use request::{RequestId, RouteRequestHandle, RouteRequestOutcome};
pub use session::RouteSession;

pub use crate::observer::ObserverId;
