//! Ordered observer registry.
//!
//! Both the route session and the replay player fan out to listeners that are
//! added and removed at runtime, possibly from inside a notification. The
//! registry keeps registration order and hands out snapshots so callers can
//! deliver without holding their state lock.
//!
//! The registry itself is not synchronized; owners keep it inside their own
//! mutex next to the state it reports on.

use std::fmt;
use std::sync::Arc;

/// Identifies one registration in an [`ObserverList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer#{}", self.0)
    }
}

/// Registration-ordered collection of shared observers.
pub struct ObserverList<T: ?Sized> {
    entries: Vec<(ObserverId, Arc<T>)>,
    next_id: u64,
}

impl<T: ?Sized> Default for ObserverList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> ObserverList<T> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }

    /// Register an observer and return its id.
    pub fn add(&mut self, observer: Arc<T>) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, observer));
        id
    }

    /// Remove one registration. Returns false if the id was not registered.
    pub fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    /// Remove every registration.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// True if the id is currently registered.
    pub fn contains(&self, id: ObserverId) -> bool {
        self.entries.iter().any(|(entry_id, _)| *entry_id == id)
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of the current registrations in registration order.
    pub fn snapshot(&self) -> Vec<(ObserverId, Arc<T>)> {
        self.entries.clone()
    }
}

impl<T: ?Sized> fmt::Debug for ObserverList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverList")
            .field("len", &self.entries.len())
            .finish()
    }
}
