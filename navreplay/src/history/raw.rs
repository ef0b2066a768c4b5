//! Raw recorded event log.
//!
//! A recording is a JSON document of the form `{"events": [ ... ]}` where each
//! record is an object with at least `type` and `event_timestamp`. A bare
//! top-level array of records is accepted as well.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde_json::Value;

use super::error::HistoryError;

/// Ordered, loosely typed records as recorded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEventLog {
    records: Vec<Value>,
}

impl RawEventLog {
    /// Wrap already-parsed records.
    pub fn from_records(records: Vec<Value>) -> Self {
        Self { records }
    }

    /// Parse a recording from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, HistoryError> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// Parse a recording from a reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, HistoryError> {
        Self::from_value(serde_json::from_reader(reader)?)
    }

    /// Load a recording from a file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, HistoryError> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }

    fn from_value(value: Value) -> Result<Self, HistoryError> {
        match value {
            Value::Array(records) => Ok(Self { records }),
            Value::Object(mut document) => match document.remove("events") {
                Some(Value::Array(records)) => Ok(Self { records }),
                Some(_) => Err(HistoryError::InvalidDocument(
                    "`events` is not an array".to_string(),
                )),
                None => Err(HistoryError::InvalidDocument(
                    "missing `events` array".to_string(),
                )),
            },
            _ => Err(HistoryError::InvalidDocument(
                "expected an object or an array".to_string(),
            )),
        }
    }

    /// The records in recorded order.
    pub fn records(&self) -> &[Value] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if the log holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_events_document() {
        let log = RawEventLog::from_json_str(
            r#"{"events":[{"type":"getStatus","event_timestamp":1.0}],"version":"1"}"#,
        )
        .unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log.records()[0]["type"], "getStatus");
    }

    #[test]
    fn test_parse_bare_array() {
        let log = RawEventLog::from_json_str(r#"[{"type":"a"},{"type":"b"}]"#).unwrap();
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_missing_events_array() {
        let err = RawEventLog::from_json_str(r#"{"version":"1"}"#).unwrap_err();
        assert!(matches!(err, HistoryError::InvalidDocument(_)));

        let err = RawEventLog::from_json_str(r#"{"events":5}"#).unwrap_err();
        assert!(matches!(err, HistoryError::InvalidDocument(_)));

        let err = RawEventLog::from_json_str("42").unwrap_err();
        assert!(matches!(err, HistoryError::InvalidDocument(_)));
    }

    #[test]
    fn test_invalid_json() {
        let err = RawEventLog::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, HistoryError::Json(_)));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"events":[{{"type":"getStatus","event_timestamp":0}}]}}"#
        )
        .unwrap();

        let log = RawEventLog::from_path(file.path()).unwrap();
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_from_missing_path() {
        let err = RawEventLog::from_path("/nonexistent/history.json").unwrap_err();
        assert!(matches!(err, HistoryError::Io(_)));
    }
}
