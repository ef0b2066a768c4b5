//! Sequence statistics.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::event::ReplayEvent;
use super::sequence::ReplaySequence;

/// Overview of a replay sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistorySummary {
    /// Total number of events.
    pub events: usize,
    /// Event count per record type tag.
    pub by_type: BTreeMap<String, usize>,
    /// Recording timestamp of the first event, seconds.
    pub first_timestamp: Option<f64>,
    /// Recording timestamp of the last event, seconds.
    pub last_timestamp: Option<f64>,
    /// Largest replay offset, seconds.
    pub duration_secs: f64,
    /// Events recorded earlier than their predecessor.
    pub out_of_order: usize,
    /// Waypoints of the first initial route, if any.
    pub initial_route_waypoints: Option<usize>,
}

impl HistorySummary {
    /// Summarize `sequence`.
    pub fn of(sequence: &ReplaySequence) -> Self {
        let mut by_type = BTreeMap::new();
        for event in sequence {
            *by_type.entry(event.event_type().to_string()).or_insert(0) += 1;
        }

        let out_of_order = sequence
            .events()
            .windows(2)
            .filter(|pair| pair[1].event_timestamp() < pair[0].event_timestamp())
            .count();

        let initial_route_waypoints = sequence.iter().find_map(|event| match event {
            ReplayEvent::InitialRoute(route) => Some(route.coordinates.len()),
            _ => None,
        });

        Self {
            events: sequence.len(),
            by_type,
            first_timestamp: sequence.first_timestamp(),
            last_timestamp: sequence.last_timestamp(),
            duration_secs: sequence.duration().as_secs_f64(),
            out_of_order,
            initial_route_waypoints,
        }
    }

    /// First timestamp as UTC, assuming Unix-epoch seconds.
    pub fn recording_start(&self) -> Option<DateTime<Utc>> {
        self.first_timestamp.and_then(unix_seconds_to_utc)
    }

    /// Last timestamp as UTC, assuming Unix-epoch seconds.
    pub fn recording_end(&self) -> Option<DateTime<Utc>> {
        self.last_timestamp.and_then(unix_seconds_to_utc)
    }
}

fn unix_seconds_to_utc(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis((seconds * 1000.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{Location, Point};
    use crate::history::{ReplayEventGetStatus, ReplayEventInitialRoute, ReplayEventUpdateLocation};

    #[test]
    fn test_summary_counts() {
        let sequence = ReplaySequence::new(vec![
            ReplayEvent::InitialRoute(ReplayEventInitialRoute {
                event_timestamp: 10.0,
                coordinates: vec![Point::new(1.0, 2.0), Point::new(1.5, 2.5)],
            }),
            ReplayEvent::UpdateLocation(ReplayEventUpdateLocation {
                event_timestamp: 12.0,
                location: Location::new(1.0, 2.0, 12.0),
            }),
            ReplayEvent::GetStatus(ReplayEventGetStatus {
                event_timestamp: 11.0,
            }),
        ]);

        let summary = HistorySummary::of(&sequence);
        assert_eq!(summary.events, 3);
        assert_eq!(summary.by_type["updateLocation"], 1);
        assert_eq!(summary.by_type["initial_route"], 1);
        assert_eq!(summary.duration_secs, 2.0);
        assert_eq!(summary.out_of_order, 1);
        assert_eq!(summary.initial_route_waypoints, Some(2));

        assert_eq!(
            summary.recording_start().map(|t| t.timestamp()),
            Some(10)
        );

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["by_type"]["getStatus"], 1);
    }
}
