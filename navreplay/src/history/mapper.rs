//! Raw record to typed event mapping.
//!
//! Built-in record types are decoded with fixed field rules:
//!
//! | `type`           | Fields read                                                   |
//! |------------------|---------------------------------------------------------------|
//! | `updateLocation` | `location.{lat, lon, time, speed, bearing, altitude, accuracyHorizontal, provider}` |
//! | `getStatus`      | none beyond `event_timestamp`                                 |
//! | `initial_route`  | `properties.routeOptions.coordinates` as `[lon, lat]` pairs   |
//! | `start_transit`  | `properties` (number)                                         |
//! | `end_transit`    | `properties` (number)                                         |
//!
//! Any other type goes to the [`CustomEventMapper`], if one is installed.
//! A record the custom mapper declines is dropped silently.

use serde_json::{Map, Value};
use tracing::{debug, trace};

use super::error::{HistoryError, MalformedRecordError};
use super::event::{
    CustomReplayEvent, ReplayEvent, ReplayEventGetStatus, ReplayEventInitialRoute,
    ReplayEventTransit, ReplayEventUpdateLocation, TYPE_END_TRANSIT, TYPE_GET_STATUS,
    TYPE_INITIAL_ROUTE, TYPE_START_TRANSIT, TYPE_UPDATE_LOCATION,
};
use super::raw::RawEventLog;
use super::sequence::ReplaySequence;
use crate::geo::{Location, Point};

/// Hook for record types the built-in mapping does not know.
pub trait CustomEventMapper: Send + Sync {
    /// Map a record of the given type, or return `None` to drop it.
    fn map(&self, event_type: &str, record: &Map<String, Value>) -> Option<ReplayEvent>;
}

impl<F> CustomEventMapper for F
where
    F: Fn(&str, &Map<String, Value>) -> Option<ReplayEvent> + Send + Sync,
{
    fn map(&self, event_type: &str, record: &Map<String, Value>) -> Option<ReplayEvent> {
        self(event_type, record)
    }
}

/// Custom mapper that keeps every unknown record with a numeric timestamp
/// as a [`ReplayEvent::Custom`].
pub fn passthrough_custom_events(
    event_type: &str,
    record: &Map<String, Value>,
) -> Option<ReplayEvent> {
    let event_timestamp = record.get("event_timestamp")?.as_f64()?;
    Some(ReplayEvent::Custom(CustomReplayEvent {
        event_timestamp,
        event_type: event_type.to_string(),
        payload: Value::Object(record.clone()),
    }))
}

/// What to do with records whose timestamp is older than their predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampOrder {
    /// Keep recorded order; the player dispatches late events immediately.
    #[default]
    PassThrough,
    /// Fail the mapping with [`HistoryError::OutOfOrder`].
    Reject,
    /// Stable-sort events by timestamp.
    Sort,
}

impl TimestampOrder {
    /// Parse a policy name (`pass_through`, `reject`, `sort`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().replace('-', "_").as_str() {
            "pass_through" | "passthrough" => Some(TimestampOrder::PassThrough),
            "reject" => Some(TimestampOrder::Reject),
            "sort" => Some(TimestampOrder::Sort),
            _ => None,
        }
    }

    /// Policy name as used in configuration.
    pub fn name(&self) -> &'static str {
        match self {
            TimestampOrder::PassThrough => "pass_through",
            TimestampOrder::Reject => "reject",
            TimestampOrder::Sort => "sort",
        }
    }
}

/// Converts a raw event log into a replay sequence.
///
/// # Example
///
/// ```ignore
/// use navreplay::history::{RawEventLog, ReplayHistoryMapper};
///
/// let raw = RawEventLog::from_path("ride.json")?;
/// let mapper = ReplayHistoryMapper::new().with_custom_mapper(my_mapper);
/// let sequence = mapper.map_to_replay_events(&raw)?;
/// ```
#[derive(Default)]
pub struct ReplayHistoryMapper {
    custom_mapper: Option<Box<dyn CustomEventMapper>>,
    order: TimestampOrder,
}

impl std::fmt::Debug for ReplayHistoryMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayHistoryMapper")
            .field("custom_mapper", &self.custom_mapper.is_some())
            .field("order", &self.order)
            .finish()
    }
}

impl ReplayHistoryMapper {
    /// Create a mapper without a custom hook, passing timestamps through.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the hook for unknown record types.
    pub fn with_custom_mapper(mut self, mapper: impl CustomEventMapper + 'static) -> Self {
        self.custom_mapper = Some(Box::new(mapper));
        self
    }

    /// Set the out-of-order timestamp policy.
    pub fn with_timestamp_order(mut self, order: TimestampOrder) -> Self {
        self.order = order;
        self
    }

    /// The active out-of-order policy.
    pub fn timestamp_order(&self) -> TimestampOrder {
        self.order
    }

    /// Map every record, preserving input order.
    ///
    /// Fails on the first malformed recognized record.
    pub fn map_to_replay_events(&self, raw: &RawEventLog) -> Result<ReplaySequence, HistoryError> {
        let mut events = Vec::with_capacity(raw.len());
        let mut dropped = 0usize;

        for (index, value) in raw.records().iter().enumerate() {
            match self.map_record(index, value)? {
                Some(event) => events.push(event),
                None => {
                    dropped += 1;
                    trace!(index, "Record dropped by custom mapper");
                }
            }
        }

        match self.order {
            TimestampOrder::PassThrough => {}
            TimestampOrder::Reject => check_order(&events)?,
            TimestampOrder::Sort => {
                events.sort_by(|a, b| a.event_timestamp().total_cmp(&b.event_timestamp()))
            }
        }

        debug!(
            records = raw.len(),
            events = events.len(),
            dropped,
            order = self.order.name(),
            "Mapped replay history"
        );
        Ok(ReplaySequence::new(events))
    }

    fn map_record(&self, index: usize, value: &Value) -> Result<Option<ReplayEvent>, HistoryError> {
        let record = value.as_object().ok_or_else(|| MalformedRecordError {
            index,
            event_type: "<unknown>".to_string(),
            field: "record".to_string(),
            expected: "an object",
        })?;
        let event_type = record
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| MalformedRecordError {
                index,
                event_type: "<unknown>".to_string(),
                field: "type".to_string(),
                expected: "a string",
            })?;

        let fields = RecordFields {
            index,
            event_type,
        };

        let event = match event_type {
            TYPE_UPDATE_LOCATION => Some(map_update_location(&fields, record)?),
            TYPE_GET_STATUS => Some(ReplayEvent::GetStatus(ReplayEventGetStatus {
                event_timestamp: fields.event_timestamp(record)?,
            })),
            TYPE_INITIAL_ROUTE => Some(map_initial_route(&fields, record)?),
            TYPE_START_TRANSIT => Some(ReplayEvent::StartTransit(map_transit(&fields, record)?)),
            TYPE_END_TRANSIT => Some(ReplayEvent::EndTransit(map_transit(&fields, record)?)),
            other => self
                .custom_mapper
                .as_ref()
                .and_then(|mapper| mapper.map(other, record)),
        };
        Ok(event)
    }
}

fn check_order(events: &[ReplayEvent]) -> Result<(), HistoryError> {
    for (index, pair) in events.windows(2).enumerate() {
        let previous = pair[0].event_timestamp();
        let timestamp = pair[1].event_timestamp();
        if timestamp < previous {
            return Err(HistoryError::OutOfOrder {
                index: index + 1,
                timestamp,
                previous,
            });
        }
    }
    Ok(())
}

fn map_update_location(
    fields: &RecordFields<'_>,
    record: &Map<String, Value>,
) -> Result<ReplayEvent, MalformedRecordError> {
    let event_timestamp = fields.event_timestamp(record)?;
    let location = fields.object(record, "location", "location")?;

    let time = fields.optional_number(location, "time", "location.time")?;
    let provider = match location.get("provider") {
        None | Some(Value::Null) => None,
        Some(Value::String(provider)) => Some(provider.clone()),
        Some(_) => return Err(fields.malformed("location.provider", "a string")),
    };

    Ok(ReplayEvent::UpdateLocation(ReplayEventUpdateLocation {
        event_timestamp,
        location: Location {
            latitude: fields.number(location, "lat", "location.lat")?,
            longitude: fields.number(location, "lon", "location.lon")?,
            time: time.unwrap_or(event_timestamp),
            speed: fields.optional_number(location, "speed", "location.speed")?,
            bearing: fields.optional_number(location, "bearing", "location.bearing")?,
            altitude: fields.optional_number(location, "altitude", "location.altitude")?,
            accuracy_horizontal: fields.optional_number(
                location,
                "accuracyHorizontal",
                "location.accuracyHorizontal",
            )?,
            provider,
        },
    }))
}

fn map_initial_route(
    fields: &RecordFields<'_>,
    record: &Map<String, Value>,
) -> Result<ReplayEvent, MalformedRecordError> {
    const PATH: &str = "properties.routeOptions.coordinates";

    let event_timestamp = fields.event_timestamp(record)?;
    let properties = fields.object(record, "properties", "properties")?;
    let route_options = fields.object(properties, "routeOptions", "properties.routeOptions")?;
    let raw_coordinates = route_options
        .get("coordinates")
        .and_then(Value::as_array)
        .ok_or_else(|| fields.malformed(PATH, "an array"))?;

    let coordinates = raw_coordinates
        .iter()
        .map(|pair| {
            lon_lat(pair).ok_or_else(|| fields.malformed(PATH, "a list of [lon, lat] pairs"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ReplayEvent::InitialRoute(ReplayEventInitialRoute {
        event_timestamp,
        coordinates,
    }))
}

/// Both leading entries must be numbers; extra entries (altitude) are ignored.
fn lon_lat(pair: &Value) -> Option<Point> {
    match pair.as_array()?.as_slice() {
        [lon, lat, ..] => Point::from_lon_lat_pair(&[lon.as_f64()?, lat.as_f64()?]),
        _ => None,
    }
}

fn map_transit(
    fields: &RecordFields<'_>,
    record: &Map<String, Value>,
) -> Result<ReplayEventTransit, MalformedRecordError> {
    Ok(ReplayEventTransit {
        event_timestamp: fields.event_timestamp(record)?,
        properties: fields.number(record, "properties", "properties")?,
    })
}

/// Field accessors that report failures against one record.
struct RecordFields<'a> {
    index: usize,
    event_type: &'a str,
}

impl RecordFields<'_> {
    fn malformed(&self, field: &str, expected: &'static str) -> MalformedRecordError {
        MalformedRecordError {
            index: self.index,
            event_type: self.event_type.to_string(),
            field: field.to_string(),
            expected,
        }
    }

    fn event_timestamp(&self, record: &Map<String, Value>) -> Result<f64, MalformedRecordError> {
        self.number(record, "event_timestamp", "event_timestamp")
    }

    fn number(
        &self,
        object: &Map<String, Value>,
        key: &str,
        path: &str,
    ) -> Result<f64, MalformedRecordError> {
        object
            .get(key)
            .and_then(Value::as_f64)
            .ok_or_else(|| self.malformed(path, "a number"))
    }

    fn optional_number(
        &self,
        object: &Map<String, Value>,
        key: &str,
        path: &str,
    ) -> Result<Option<f64>, MalformedRecordError> {
        match object.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_f64()
                .map(Some)
                .ok_or_else(|| self.malformed(path, "a number")),
        }
    }

    fn object<'v>(
        &self,
        object: &'v Map<String, Value>,
        key: &str,
        path: &str,
    ) -> Result<&'v Map<String, Value>, MalformedRecordError> {
        object
            .get(key)
            .and_then(Value::as_object)
            .ok_or_else(|| self.malformed(path, "an object"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn location_record(ts: f64) -> Value {
        json!({
            "type": "updateLocation",
            "event_timestamp": ts,
            "location": {
                "lat": 37.7749,
                "lon": -122.4194,
                "time": ts,
                "speed": 12.5,
                "bearing": 90.0,
                "altitude": 15.0,
                "accuracyHorizontal": 4.0,
                "provider": "fused"
            }
        })
    }

    fn status_record(ts: f64) -> Value {
        json!({"type": "getStatus", "event_timestamp": ts})
    }

    #[test]
    fn test_maps_update_location() {
        let raw = RawEventLog::from_records(vec![location_record(100.0)]);
        let seq = ReplayHistoryMapper::new().map_to_replay_events(&raw).unwrap();

        let location = seq.get(0).and_then(ReplayEvent::location).unwrap();
        assert_eq!(location.latitude, 37.7749);
        assert_eq!(location.longitude, -122.4194);
        assert_eq!(location.speed, Some(12.5));
        assert_eq!(location.bearing, Some(90.0));
        assert_eq!(location.altitude, Some(15.0));
        assert_eq!(location.accuracy_horizontal, Some(4.0));
        assert_eq!(location.provider.as_deref(), Some("fused"));
        assert_eq!(seq.get(0).unwrap().event_timestamp(), 100.0);
    }

    #[test]
    fn test_location_optional_fields() {
        let raw = RawEventLog::from_records(vec![json!({
            "type": "updateLocation",
            "event_timestamp": 5.0,
            "location": {"lat": 1.0, "lon": 2.0}
        })]);
        let seq = ReplayHistoryMapper::new().map_to_replay_events(&raw).unwrap();
        let location = seq.get(0).and_then(ReplayEvent::location).unwrap();
        assert_eq!(location.time, 5.0);
        assert!(location.speed.is_none());
        assert!(location.provider.is_none());
    }

    #[test]
    fn test_maps_initial_route_lon_lat_order() {
        let raw = RawEventLog::from_records(vec![json!({
            "type": "initial_route",
            "event_timestamp": 1.0,
            "properties": {
                "routeOptions": {
                    "coordinates": [[-77.03, 38.90], [-77.01, 38.88]]
                }
            }
        })]);
        let seq = ReplayHistoryMapper::new().map_to_replay_events(&raw).unwrap();

        match seq.get(0).unwrap() {
            ReplayEvent::InitialRoute(route) => {
                assert_eq!(route.coordinates.len(), 2);
                assert_eq!(route.coordinates[0], Point::new(38.90, -77.03));
                assert_eq!(route.coordinates[1], Point::new(38.88, -77.01));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_non_numeric_route_coordinate_fails() {
        for pair in [json!(["bad", -77.03, 38.90]), json!([-77.01, null, 38.88])] {
            let raw = RawEventLog::from_records(vec![json!({
                "type": "initial_route",
                "event_timestamp": 1.0,
                "properties": {
                    "routeOptions": {
                        "coordinates": [[-77.05, 38.91], pair]
                    }
                }
            })]);
            let err = ReplayHistoryMapper::new()
                .map_to_replay_events(&raw)
                .unwrap_err();
            assert!(matches!(
                err,
                HistoryError::Malformed(ref e)
                    if e.field == "properties.routeOptions.coordinates" && e.index == 0
            ));
        }
    }

    #[test]
    fn test_route_coordinate_altitude_ignored() {
        let raw = RawEventLog::from_records(vec![json!({
            "type": "initial_route",
            "event_timestamp": 1.0,
            "properties": { "routeOptions": { "coordinates": [[-77.03, 38.90, 12.5]] } }
        })]);
        let seq = ReplayHistoryMapper::new().map_to_replay_events(&raw).unwrap();
        match seq.get(0).unwrap() {
            ReplayEvent::InitialRoute(route) => {
                assert_eq!(route.coordinates, vec![Point::new(38.90, -77.03)]);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_maps_transit_events() {
        let raw = RawEventLog::from_records(vec![
            json!({
                "type": "start_transit",
                "properties": 1580744133.13,
                "event_timestamp": 1580744133.130429
            }),
            json!({
                "type": "end_transit",
                "properties": 1580744200.0,
                "event_timestamp": 1580744200.5
            }),
        ]);
        let seq = ReplayHistoryMapper::new().map_to_replay_events(&raw).unwrap();

        assert!(matches!(
            seq.get(0),
            Some(ReplayEvent::StartTransit(t)) if t.properties == 1580744133.13
        ));
        assert!(matches!(seq.get(1), Some(ReplayEvent::EndTransit(_))));
        assert_eq!(seq.get(1).unwrap().event_type(), "end_transit");
    }

    #[test]
    fn test_missing_timestamp_fails_whole_mapping() {
        let raw = RawEventLog::from_records(vec![
            status_record(0.0),
            json!({"type": "getStatus"}),
            status_record(2.0),
        ]);
        let err = ReplayHistoryMapper::new()
            .map_to_replay_events(&raw)
            .unwrap_err();

        match err {
            HistoryError::Malformed(e) => {
                assert_eq!(e.index, 1);
                assert_eq!(e.event_type, "getStatus");
                assert_eq!(e.field, "event_timestamp");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_bad_location_field() {
        let raw = RawEventLog::from_records(vec![json!({
            "type": "updateLocation",
            "event_timestamp": 0.0,
            "location": {"lat": "north", "lon": 2.0}
        })]);
        let err = ReplayHistoryMapper::new()
            .map_to_replay_events(&raw)
            .unwrap_err();
        assert!(matches!(err, HistoryError::Malformed(ref e) if e.field == "location.lat"));
    }

    #[test]
    fn test_missing_type_is_malformed() {
        let raw = RawEventLog::from_records(vec![json!({"event_timestamp": 1.0})]);
        let err = ReplayHistoryMapper::new()
            .map_to_replay_events(&raw)
            .unwrap_err();
        assert!(matches!(err, HistoryError::Malformed(ref e) if e.field == "type"));

        let raw = RawEventLog::from_records(vec![json!(42)]);
        let err = ReplayHistoryMapper::new()
            .map_to_replay_events(&raw)
            .unwrap_err();
        assert!(matches!(err, HistoryError::Malformed(ref e) if e.field == "record"));
    }

    #[test]
    fn test_unknown_type_dropped_without_hook() {
        let raw = RawEventLog::from_records(vec![
            status_record(0.0),
            json!({"type": "setRoute", "event_timestamp": 0.5}),
            status_record(1.0),
        ]);
        let seq = ReplayHistoryMapper::new().map_to_replay_events(&raw).unwrap();
        assert_eq!(seq.len(), 2);
    }

    #[test]
    fn test_custom_mapper_hook() {
        let raw = RawEventLog::from_records(vec![
            json!({"type": "reroute", "event_timestamp": 3.0, "reason": "off-route"}),
            json!({"type": "ignored", "event_timestamp": 4.0}),
        ]);
        let mapper = ReplayHistoryMapper::new().with_custom_mapper(
            |event_type: &str, record: &Map<String, Value>| {
                if event_type != "reroute" {
                    return None;
                }
                passthrough_custom_events(event_type, record)
            },
        );

        let seq = mapper.map_to_replay_events(&raw).unwrap();
        assert_eq!(seq.len(), 1);
        match seq.get(0).unwrap() {
            ReplayEvent::Custom(custom) => {
                assert_eq!(custom.event_type, "reroute");
                assert_eq!(custom.event_timestamp, 3.0);
                assert_eq!(custom.payload["reason"], "off-route");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_out_of_order_pass_through() {
        let raw = RawEventLog::from_records(vec![status_record(2.0), status_record(1.0)]);
        let seq = ReplayHistoryMapper::new().map_to_replay_events(&raw).unwrap();
        assert_eq!(seq.get(0).unwrap().event_timestamp(), 2.0);
        assert_eq!(seq.get(1).unwrap().event_timestamp(), 1.0);
    }

    #[test]
    fn test_out_of_order_reject() {
        let raw = RawEventLog::from_records(vec![
            status_record(1.0),
            status_record(2.0),
            status_record(1.5),
        ]);
        let err = ReplayHistoryMapper::new()
            .with_timestamp_order(TimestampOrder::Reject)
            .map_to_replay_events(&raw)
            .unwrap_err();
        assert!(matches!(
            err,
            HistoryError::OutOfOrder { index: 2, timestamp, previous }
                if timestamp == 1.5 && previous == 2.0
        ));
    }

    #[test]
    fn test_out_of_order_sort_is_stable() {
        let raw = RawEventLog::from_records(vec![
            status_record(2.0),
            location_record(1.0),
            status_record(1.0),
        ]);
        let seq = ReplayHistoryMapper::new()
            .with_timestamp_order(TimestampOrder::Sort)
            .map_to_replay_events(&raw)
            .unwrap();
        let types: Vec<_> = seq.iter().map(ReplayEvent::event_type).collect();
        assert_eq!(types, vec!["updateLocation", "getStatus", "getStatus"]);
    }

    #[test]
    fn test_timestamp_order_names() {
        assert_eq!(
            TimestampOrder::from_name("pass-through"),
            Some(TimestampOrder::PassThrough)
        );
        assert_eq!(TimestampOrder::from_name("Reject"), Some(TimestampOrder::Reject));
        assert_eq!(TimestampOrder::from_name("sort"), Some(TimestampOrder::Sort));
        assert_eq!(TimestampOrder::from_name("shuffle"), None);
        assert_eq!(TimestampOrder::Sort.name(), "sort");
    }

    proptest! {
        #[test]
        fn prop_mapping_preserves_count_and_order(
            kinds in proptest::collection::vec(0u8..3, 0..50)
        ) {
            let records: Vec<Value> = kinds
                .iter()
                .enumerate()
                .map(|(i, kind)| match kind {
                    0 => location_record(i as f64),
                    1 => status_record(i as f64),
                    _ => json!({"type": "unknown", "event_timestamp": i as f64}),
                })
                .collect();
            let raw = RawEventLog::from_records(records);
            let seq = ReplayHistoryMapper::new().map_to_replay_events(&raw).unwrap();

            let expected: Vec<f64> = kinds
                .iter()
                .enumerate()
                .filter(|(_, kind)| **kind < 2)
                .map(|(i, _)| i as f64)
                .collect();
            let actual: Vec<f64> = seq.iter().map(ReplayEvent::event_timestamp).collect();
            prop_assert_eq!(actual, expected);
        }
    }
}
