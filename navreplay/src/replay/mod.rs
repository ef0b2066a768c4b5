//! Time-faithful replay of recorded sequences.
//!
//! [`ReplayHistoryPlayer`] walks a [`ReplaySequence`](crate::history::ReplaySequence)
//! and delivers each event at its recorded offset from the first one. The
//! adapters turn the raw batches into the feeds the rest of a navigation
//! stack consumes:
//!
//! - [`ReplayLocationEngine`] publishes location samples into a
//!   [`LocationFeed`](crate::location::LocationFeed)
//! - [`ReplayProgressFeed`] reports progress on every status tick

mod clock;
mod location_engine;
mod player;
mod progress;

pub use clock::{PlaybackClock, MAX_PLAYBACK_SPEED, MIN_PLAYBACK_SPEED};
pub use location_engine::ReplayLocationEngine;
pub use player::{PlayerState, ReplayEvents, ReplayEventsObserver, ReplayHistoryPlayer};
pub use progress::{ReplayProgress, ReplayProgressFeed, ReplayProgressObserver};
