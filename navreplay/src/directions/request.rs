//! Route request handles and outcomes.

use std::fmt;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::route::{RouteOptions, RouteSet};
use crate::router::RouterError;

/// Session-unique id of a router operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub(crate) u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request#{}", self.0)
    }
}

/// Final result of a route request.
///
/// Mirrors the callback that fired for the same request.
#[derive(Debug, Clone)]
pub enum RouteRequestOutcome {
    /// Routes were returned.
    Ready(RouteSet),

    /// The router failed.
    Failed {
        error: RouterError,
        options: RouteOptions,
    },

    /// The request was superseded, cancelled, or never issued.
    Canceled { options: RouteOptions },
}

impl RouteRequestOutcome {
    /// True for [`RouteRequestOutcome::Ready`].
    pub fn is_ready(&self) -> bool {
        matches!(self, RouteRequestOutcome::Ready(_))
    }

    /// True for [`RouteRequestOutcome::Canceled`].
    pub fn is_canceled(&self) -> bool {
        matches!(self, RouteRequestOutcome::Canceled { .. })
    }

    /// The routes, if the request succeeded.
    pub fn routes(&self) -> Option<&RouteSet> {
        match self {
            RouteRequestOutcome::Ready(routes) => Some(routes),
            _ => None,
        }
    }
}

/// Handle to one in-flight route request.
///
/// Dropping the handle does not cancel the request; call [`cancel`](Self::cancel).
#[derive(Debug)]
pub struct RouteRequestHandle {
    id: RequestId,
    token: CancellationToken,
    options: RouteOptions,
    outcome_rx: oneshot::Receiver<RouteRequestOutcome>,
}

impl RouteRequestHandle {
    pub(crate) fn new(
        id: RequestId,
        token: CancellationToken,
        options: RouteOptions,
        outcome_rx: oneshot::Receiver<RouteRequestOutcome>,
    ) -> Self {
        Self {
            id,
            token,
            options,
            outcome_rx,
        }
    }

    /// Handle for a request that was resolved without reaching the router.
    pub(crate) fn resolved(
        id: RequestId,
        options: RouteOptions,
        outcome: RouteRequestOutcome,
    ) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(outcome);
        let token = CancellationToken::new();
        token.cancel();
        Self::new(id, token, options, rx)
    }

    /// Id of this request.
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Options this request was issued with.
    pub fn options(&self) -> &RouteOptions {
        &self.options
    }

    /// Cancel the request.
    ///
    /// No effect if the request already completed.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// True once the request was cancelled by any path.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait for the request to complete.
    ///
    /// If the runtime drops the request task before it reports, the request
    /// is treated as cancelled.
    pub async fn outcome(self) -> RouteRequestOutcome {
        match self.outcome_rx.await {
            Ok(outcome) => outcome,
            Err(_) => RouteRequestOutcome::Canceled {
                options: self.options,
            },
        }
    }
}
