//! Location feed shared by live and replayed sources.
//!
//! Downstream consumers register a [`LocationObserver`] with a
//! [`LocationFeed`]. Sources publish samples into the feed without knowing
//! whether they are a device provider or a replayed recording.
//!
//! Each publish delivers the raw sample and then the enhanced sample with any
//! interpolated key points between the previous and current sample. Map
//! matching is out of scope, so the enhanced sample is the raw one.

use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};
use tracing::trace;

use crate::geo::Location;
use crate::observer::{ObserverId, ObserverList};

/// Receives location updates.
pub trait LocationObserver: Send + Sync {
    /// A new raw sample arrived.
    fn on_raw_location_changed(&self, raw_location: &Location);

    /// A new enhanced sample is available.
    ///
    /// `key_points` holds intermediate samples since the previous update,
    /// oldest first, or is empty.
    fn on_enhanced_location_changed(&self, enhanced_location: &Location, key_points: &[Location]);
}

/// Fanout point for location samples.
#[derive(Default)]
pub struct LocationFeed {
    observers: Mutex<ObserverList<dyn LocationObserver>>,
    last_location: Mutex<Option<Location>>,
    fanout: ReentrantMutex<()>,
}

impl std::fmt::Debug for LocationFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationFeed")
            .field("observers", &self.observers.lock().len())
            .field("last_location", &*self.last_location.lock())
            .finish()
    }
}

impl LocationFeed {
    /// Create an empty feed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer.
    ///
    /// If a sample was already published the observer receives it once
    /// immediately as an enhanced update without key points.
    pub fn register_location_observer(&self, observer: Arc<dyn LocationObserver>) -> ObserverId {
        let _fanout = self.fanout.lock();
        let id = self.observers.lock().add(Arc::clone(&observer));
        let last = self.last_location.lock().clone();
        if let Some(location) = last {
            observer.on_enhanced_location_changed(&location, &[]);
        }
        id
    }

    /// Remove one observer.
    pub fn unregister_location_observer(&self, id: ObserverId) -> bool {
        self.observers.lock().remove(id)
    }

    /// Remove every observer.
    pub fn unregister_all_location_observers(&self) {
        self.observers.lock().clear();
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers.lock().len()
    }

    /// Most recently published sample.
    pub fn last_location(&self) -> Option<Location> {
        self.last_location.lock().clone()
    }

    /// Publish a sample to every observer.
    pub fn publish(&self, location: Location, key_points: &[Location]) {
        let _fanout = self.fanout.lock();
        *self.last_location.lock() = Some(location.clone());
        let observers = self.observers.lock().snapshot();

        trace!(
            lat = location.latitude,
            lon = location.longitude,
            key_points = key_points.len(),
            observers = observers.len(),
            "Publishing location"
        );

        for (id, observer) in observers {
            if !self.observers.lock().contains(id) {
                continue;
            }
            observer.on_raw_location_changed(&location);
            observer.on_enhanced_location_changed(&location, key_points);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        raw: Mutex<Vec<Location>>,
        enhanced: Mutex<Vec<(Location, usize)>>,
    }

    impl LocationObserver for Recorder {
        fn on_raw_location_changed(&self, raw_location: &Location) {
            self.raw.lock().push(raw_location.clone());
        }

        fn on_enhanced_location_changed(&self, enhanced: &Location, key_points: &[Location]) {
            self.enhanced.lock().push((enhanced.clone(), key_points.len()));
        }
    }

    #[test]
    fn test_publish_reaches_observers() {
        let feed = LocationFeed::new();
        let recorder = Arc::new(Recorder::default());
        feed.register_location_observer(recorder.clone());

        let a = Location::new(1.0, 2.0, 0.0);
        let b = Location::new(1.1, 2.1, 1.0);
        feed.publish(b.clone(), &[a.clone(), b.clone()]);

        assert_eq!(*recorder.raw.lock(), vec![b.clone()]);
        assert_eq!(*recorder.enhanced.lock(), vec![(b.clone(), 2)]);
        assert_eq!(feed.last_location(), Some(b));
    }

    #[test]
    fn test_late_observer_gets_last_location() {
        let feed = LocationFeed::new();
        feed.publish(Location::new(1.0, 2.0, 0.0), &[]);

        let recorder = Arc::new(Recorder::default());
        feed.register_location_observer(recorder.clone());
        assert!(recorder.raw.lock().is_empty());
        assert_eq!(recorder.enhanced.lock().len(), 1);
    }

    #[test]
    fn test_unregister() {
        let feed = LocationFeed::new();
        let recorder = Arc::new(Recorder::default());
        let id = feed.register_location_observer(recorder.clone());

        assert!(feed.unregister_location_observer(id));
        feed.publish(Location::new(1.0, 2.0, 0.0), &[]);
        assert!(recorder.raw.lock().is_empty());

        feed.register_location_observer(recorder.clone());
        feed.unregister_all_location_observers();
        assert_eq!(feed.observer_count(), 0);
    }
}
