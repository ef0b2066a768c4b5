//! Progress feed driven by recorded status ticks.
//!
//! The recording's `getStatus` events mark the moments the navigator polled
//! its own state. Replaying them as progress updates gives route-progress
//! consumers the same cadence they saw while recording.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::trace;

use super::player::{ReplayEvents, ReplayHistoryPlayer};
use crate::history::ReplayEvent;
use crate::observer::{ObserverId, ObserverList};

/// Replay position at a status tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplayProgress {
    /// Replay offset of the tick.
    pub position: Duration,
    /// Replay offset of the last event.
    pub duration: Duration,
    /// Events delivered up to and including the tick's batch.
    pub events_dispatched: usize,
    /// Total events in the sequence.
    pub total_events: usize,
    /// Recording timestamp of the tick.
    pub status_timestamp: f64,
}

impl ReplayProgress {
    /// Fraction of the replay offset covered, in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.position.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }
}

/// Receives progress updates.
pub trait ReplayProgressObserver: Send + Sync {
    fn on_replay_progress(&self, progress: &ReplayProgress);
}

impl<F> ReplayProgressObserver for F
where
    F: Fn(&ReplayProgress) + Send + Sync,
{
    fn on_replay_progress(&self, progress: &ReplayProgress) {
        self(progress)
    }
}

/// Publishes a [`ReplayProgress`] for every `GetStatus` event replayed.
pub struct ReplayProgressFeed {
    observers: Mutex<ObserverList<dyn ReplayProgressObserver>>,
    last: Mutex<Option<ReplayProgress>>,
    duration: Duration,
    total_events: usize,
}

impl std::fmt::Debug for ReplayProgressFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayProgressFeed")
            .field("observers", &self.observers.lock().len())
            .field("last", &*self.last.lock())
            .finish()
    }
}

impl ReplayProgressFeed {
    /// Create a feed listening to `player`.
    pub fn attach(player: &ReplayHistoryPlayer) -> Arc<Self> {
        let feed = Arc::new(Self {
            observers: Mutex::new(ObserverList::new()),
            last: Mutex::new(None),
            duration: player.duration(),
            total_events: player.sequence().len(),
        });
        let sink = Arc::clone(&feed);
        player.observe_replay_events(Arc::new(move |batch: &ReplayEvents| {
            sink.handle_batch(batch);
        }));
        feed
    }

    /// Register a progress observer.
    pub fn register_progress_observer(
        &self,
        observer: Arc<dyn ReplayProgressObserver>,
    ) -> ObserverId {
        self.observers.lock().add(observer)
    }

    /// Remove a progress observer.
    pub fn unregister_progress_observer(&self, id: ObserverId) -> bool {
        self.observers.lock().remove(id)
    }

    /// Most recent update.
    pub fn last_progress(&self) -> Option<ReplayProgress> {
        *self.last.lock()
    }

    fn handle_batch(&self, batch: &ReplayEvents) {
        for (i, event) in batch.iter().enumerate() {
            let ReplayEvent::GetStatus(status) = event else {
                continue;
            };
            let progress = ReplayProgress {
                position: batch.offset,
                duration: self.duration,
                events_dispatched: batch.first_index + i + 1,
                total_events: self.total_events,
                status_timestamp: status.event_timestamp,
            };
            *self.last.lock() = Some(progress);

            trace!(
                position_ms = progress.position.as_millis() as u64,
                dispatched = progress.events_dispatched,
                "Replay progress"
            );
            let observers = self.observers.lock().snapshot();
            for (id, observer) in observers {
                if self.observers.lock().contains(id) {
                    observer.on_replay_progress(&progress);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Location;
    use crate::history::{ReplayEventGetStatus, ReplayEventUpdateLocation};

    #[tokio::test(start_paused = true)]
    async fn test_progress_on_status_ticks() {
        let player = ReplayHistoryPlayer::new(
            vec![
                ReplayEvent::UpdateLocation(ReplayEventUpdateLocation {
                    event_timestamp: 100.0,
                    location: Location::new(52.0, 13.0, 100.0),
                }),
                ReplayEvent::GetStatus(ReplayEventGetStatus {
                    event_timestamp: 101.0,
                }),
                ReplayEvent::GetStatus(ReplayEventGetStatus {
                    event_timestamp: 102.0,
                }),
            ]
            .into(),
        );
        let feed = ReplayProgressFeed::attach(&player);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        feed.register_progress_observer(Arc::new(move |p: &ReplayProgress| {
            sink.lock().push(*p);
        }));

        player.play();
        player.wait_until_terminal().await;

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].position, Duration::from_secs(1));
        assert_eq!(seen[0].events_dispatched, 2);
        assert_eq!(seen[1].status_timestamp, 102.0);
        assert_eq!(seen[1].fraction(), 1.0);
        assert_eq!(feed.last_progress(), Some(seen[1]));
    }

    #[test]
    fn test_fraction_of_empty_duration() {
        let progress = ReplayProgress {
            position: Duration::ZERO,
            duration: Duration::ZERO,
            events_dispatched: 0,
            total_events: 0,
            status_timestamp: 0.0,
        };
        assert_eq!(progress.fraction(), 1.0);
    }
}
