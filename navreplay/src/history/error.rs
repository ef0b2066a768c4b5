//! History loading and mapping errors.

use thiserror::Error;

/// A recognized record is missing a required field or has the wrong type.
///
/// Fails the whole mapping call: offsets between events are only meaningful
/// if no record in the middle is lost.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("Malformed record #{index} ({event_type}): field `{field}` is missing or not {expected}")]
pub struct MalformedRecordError {
    /// Position of the record in the raw log.
    pub index: usize,
    /// Record type tag, or `<unknown>` if the tag itself was unusable.
    pub event_type: String,
    /// Path of the offending field.
    pub field: String,
    /// What the field should have been.
    pub expected: &'static str,
}

/// Errors that can occur while loading or mapping a recorded history.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Reading the history failed.
    #[error("Failed to read history: {0}")]
    Io(#[from] std::io::Error),

    /// The history is not valid JSON.
    #[error("Failed to parse history JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The JSON document does not hold an event list.
    #[error("Invalid history document: {0}")]
    InvalidDocument(String),

    /// A record could not be mapped.
    #[error(transparent)]
    Malformed(#[from] MalformedRecordError),

    /// A record is older than its predecessor and the mapper rejects that.
    #[error("Record #{index} at {timestamp}s precedes the previous record at {previous}s")]
    OutOfOrder {
        index: usize,
        timestamp: f64,
        previous: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_record_display() {
        let err = MalformedRecordError {
            index: 4,
            event_type: "updateLocation".to_string(),
            field: "location.lat".to_string(),
            expected: "a number",
        };
        assert_eq!(
            err.to_string(),
            "Malformed record #4 (updateLocation): field `location.lat` is missing or not a number"
        );
    }

    #[test]
    fn test_history_error_from_malformed() {
        let err: HistoryError = MalformedRecordError {
            index: 0,
            event_type: "getStatus".to_string(),
            field: "event_timestamp".to_string(),
            expected: "a number",
        }
        .into();
        assert!(matches!(err, HistoryError::Malformed(ref e) if e.index == 0));
        assert!(err.to_string().contains("event_timestamp"));
    }
}
