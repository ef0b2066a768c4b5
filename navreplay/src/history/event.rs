//! Typed replay events.

use serde_json::Value;

use crate::geo::{Location, Point};

/// Record type tag of a location sample.
pub const TYPE_UPDATE_LOCATION: &str = "updateLocation";
/// Record type tag of a navigator status tick.
pub const TYPE_GET_STATUS: &str = "getStatus";
/// Record type tag of the route that was active when recording started.
pub const TYPE_INITIAL_ROUTE: &str = "initial_route";
/// Record type tag of a transit start marker.
pub const TYPE_START_TRANSIT: &str = "start_transit";
/// Record type tag of a transit end marker.
pub const TYPE_END_TRANSIT: &str = "end_transit";

/// One recorded event.
///
/// Every variant carries the recording-time `event_timestamp` in seconds.
/// It is only used to compute offsets between events and has no meaning as a
/// wall-clock time during replay.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayEvent {
    /// A device location sample.
    UpdateLocation(ReplayEventUpdateLocation),
    /// A navigator status tick.
    GetStatus(ReplayEventGetStatus),
    /// The route active at the start of the recording.
    InitialRoute(ReplayEventInitialRoute),
    /// Transit started.
    StartTransit(ReplayEventTransit),
    /// Transit ended.
    EndTransit(ReplayEventTransit),
    /// A domain-specific event produced by a custom mapper.
    Custom(CustomReplayEvent),
}

impl ReplayEvent {
    /// Recording-time timestamp in seconds.
    pub fn event_timestamp(&self) -> f64 {
        match self {
            ReplayEvent::UpdateLocation(e) => e.event_timestamp,
            ReplayEvent::GetStatus(e) => e.event_timestamp,
            ReplayEvent::InitialRoute(e) => e.event_timestamp,
            ReplayEvent::StartTransit(e) | ReplayEvent::EndTransit(e) => e.event_timestamp,
            ReplayEvent::Custom(e) => e.event_timestamp,
        }
    }

    /// The record type tag this event corresponds to.
    pub fn event_type(&self) -> &str {
        match self {
            ReplayEvent::UpdateLocation(_) => TYPE_UPDATE_LOCATION,
            ReplayEvent::GetStatus(_) => TYPE_GET_STATUS,
            ReplayEvent::InitialRoute(_) => TYPE_INITIAL_ROUTE,
            ReplayEvent::StartTransit(_) => TYPE_START_TRANSIT,
            ReplayEvent::EndTransit(_) => TYPE_END_TRANSIT,
            ReplayEvent::Custom(e) => &e.event_type,
        }
    }

    /// The location sample, for location events.
    pub fn location(&self) -> Option<&Location> {
        match self {
            ReplayEvent::UpdateLocation(e) => Some(&e.location),
            _ => None,
        }
    }
}

/// A recorded location sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayEventUpdateLocation {
    pub event_timestamp: f64,
    pub location: Location,
}

/// A recorded status tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplayEventGetStatus {
    pub event_timestamp: f64,
}

/// The initial route's waypoints (latitude/longitude order).
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayEventInitialRoute {
    pub event_timestamp: f64,
    pub coordinates: Vec<Point>,
}

/// A transit start or end marker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplayEventTransit {
    pub event_timestamp: f64,
    /// Numeric marker recorded with the event.
    pub properties: f64,
}

/// An event of a type the built-in mapping does not know.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomReplayEvent {
    pub event_timestamp: f64,
    /// Original record type tag.
    pub event_type: String,
    /// The record's payload, untouched.
    pub payload: Value,
}
