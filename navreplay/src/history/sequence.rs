//! Immutable, replayable event sequence.

use std::sync::Arc;
use std::time::Duration;

use super::event::ReplayEvent;

/// Typed events in recorded order.
///
/// Shared and never modified once built. Playback position lives in the
/// player, so the same sequence can be replayed any number of times.
#[derive(Debug, Clone, Default)]
pub struct ReplaySequence {
    events: Arc<[ReplayEvent]>,
}

impl ReplaySequence {
    /// Build a sequence from events in the order they should be replayed.
    pub fn new(events: Vec<ReplayEvent>) -> Self {
        Self {
            events: events.into(),
        }
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True if there is nothing to replay.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// All events in order.
    pub fn events(&self) -> &[ReplayEvent] {
        &self.events
    }

    /// Event at the given index.
    pub fn get(&self, index: usize) -> Option<&ReplayEvent> {
        self.events.get(index)
    }

    /// Iterate events in order.
    pub fn iter(&self) -> std::slice::Iter<'_, ReplayEvent> {
        self.events.iter()
    }

    /// Recording timestamp of the first event.
    pub fn first_timestamp(&self) -> Option<f64> {
        self.events.first().map(ReplayEvent::event_timestamp)
    }

    /// Recording timestamp of the last event.
    pub fn last_timestamp(&self) -> Option<f64> {
        self.events.last().map(ReplayEvent::event_timestamp)
    }

    /// Replay offset of the event at `index`: time since the first event.
    ///
    /// Events recorded before the first event get a zero offset.
    pub fn offset_of(&self, index: usize) -> Duration {
        match (self.first_timestamp(), self.events.get(index)) {
            (Some(first), Some(event)) => seconds_to_duration(event.event_timestamp() - first),
            _ => Duration::ZERO,
        }
    }

    /// Replay offset truncated to whole milliseconds.
    ///
    /// Events sharing this value are delivered together.
    pub fn offset_millis(&self, index: usize) -> u128 {
        self.offset_of(index).as_millis()
    }

    /// Largest replay offset in the sequence.
    pub fn duration(&self) -> Duration {
        (0..self.events.len())
            .map(|i| self.offset_of(i))
            .max()
            .unwrap_or(Duration::ZERO)
    }

    /// Index of the first event whose offset is at or after `offset`.
    ///
    /// Returns `len()` if every event is earlier.
    pub fn index_at_offset(&self, offset: Duration) -> usize {
        (0..self.events.len())
            .find(|&i| self.offset_of(i) >= offset)
            .unwrap_or(self.events.len())
    }
}

impl From<Vec<ReplayEvent>> for ReplaySequence {
    fn from(events: Vec<ReplayEvent>) -> Self {
        Self::new(events)
    }
}

impl<'a> IntoIterator for &'a ReplaySequence {
    type Item = &'a ReplayEvent;
    type IntoIter = std::slice::Iter<'a, ReplayEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// Convert a seconds delta to a duration, clamping negative and invalid values to zero.
fn seconds_to_duration(seconds: f64) -> Duration {
    if seconds.is_finite() && seconds > 0.0 {
        Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}
