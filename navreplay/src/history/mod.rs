//! Recorded trip history: raw log, typed events and mapping.
//!
//! # Pipeline
//!
//! ```text
//! history.json ──► RawEventLog ──► ReplayHistoryMapper ──► ReplaySequence ──► ReplayHistoryPlayer
//!                  (untyped JSON)   (built-ins + custom hook) (immutable, typed)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use navreplay::history::{RawEventLog, ReplayHistoryMapper, TimestampOrder};
//!
//! let raw = RawEventLog::from_path("ride.json")?;
//! let sequence = ReplayHistoryMapper::new()
//!     .with_timestamp_order(TimestampOrder::Reject)
//!     .map_to_replay_events(&raw)?;
//! println!("{} events over {:?}", sequence.len(), sequence.duration());
//! ```

mod error;
mod event;
mod mapper;
mod raw;
mod sequence;
mod summary;

pub use error::{HistoryError, MalformedRecordError};
pub use event::{
    CustomReplayEvent, ReplayEvent, ReplayEventGetStatus, ReplayEventInitialRoute,
    ReplayEventTransit, ReplayEventUpdateLocation, TYPE_END_TRANSIT, TYPE_GET_STATUS,
    TYPE_INITIAL_ROUTE, TYPE_START_TRANSIT, TYPE_UPDATE_LOCATION,
};
pub use mapper::{passthrough_custom_events, CustomEventMapper, ReplayHistoryMapper, TimestampOrder};
pub use raw::RawEventLog;
pub use sequence::ReplaySequence;
pub use summary::HistorySummary;
