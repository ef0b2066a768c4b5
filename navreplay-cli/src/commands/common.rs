//! Common types and utilities shared across CLI commands.

use std::path::Path;

use clap::ValueEnum;
use navreplay::config::ConfigFile;
use navreplay::history::{
    passthrough_custom_events, RawEventLog, ReplayHistoryMapper, ReplaySequence, TimestampOrder,
};
use navreplay::replay::{MAX_PLAYBACK_SPEED, MIN_PLAYBACK_SPEED};
use tracing::info;

use crate::error::CliError;

/// Out-of-order timestamp policy for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum OrderPolicy {
    /// Keep recorded order; late records are dispatched immediately
    PassThrough,
    /// Refuse histories whose timestamps go backwards
    Reject,
    /// Sort records by timestamp before replay
    Sort,
}

impl From<OrderPolicy> for TimestampOrder {
    fn from(policy: OrderPolicy) -> Self {
        match policy {
            OrderPolicy::PassThrough => TimestampOrder::PassThrough,
            OrderPolicy::Reject => TimestampOrder::Reject,
            OrderPolicy::Sort => TimestampOrder::Sort,
        }
    }
}

/// Resolve the timestamp policy: CLI takes precedence, then config.
pub fn resolve_order(cli_order: Option<OrderPolicy>, config: &ConfigFile) -> TimestampOrder {
    cli_order
        .map(TimestampOrder::from)
        .unwrap_or(config.history.timestamp_order)
}

/// Resolve the playback speed: CLI takes precedence, then config.
pub fn resolve_speed(cli_speed: Option<f64>, config: &ConfigFile) -> Result<f64, CliError> {
    let speed = cli_speed.unwrap_or(config.replay.speed);
    if !(MIN_PLAYBACK_SPEED..=MAX_PLAYBACK_SPEED).contains(&speed) {
        return Err(CliError::Config(format!(
            "playback speed {} is outside {}..={}",
            speed, MIN_PLAYBACK_SPEED, MAX_PLAYBACK_SPEED
        )));
    }
    Ok(speed)
}

/// Load and map a history file.
///
/// Unknown record types are kept as custom events so they still take part
/// in pacing.
pub fn load_sequence(path: &Path, order: TimestampOrder) -> Result<ReplaySequence, CliError> {
    let raw = RawEventLog::from_path(path)?;
    let sequence = ReplayHistoryMapper::new()
        .with_custom_mapper(passthrough_custom_events)
        .with_timestamp_order(order)
        .map_to_replay_events(&raw)?;
    info!(
        path = %path.display(),
        records = raw.len(),
        events = sequence.len(),
        "History loaded"
    );
    Ok(sequence)
}

/// Format a duration as `1h 02m 03.4s`, `2m 03.4s` or `3.4s`.
pub fn format_duration(duration: std::time::Duration) -> String {
    let total = duration.as_secs_f64();
    let hours = (total / 3600.0).floor() as u64;
    let minutes = ((total % 3600.0) / 60.0).floor() as u64;
    let seconds = total % 60.0;
    if hours > 0 {
        format!("{}h {:02}m {:04.1}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {:04.1}s", minutes, seconds)
    } else {
        format!("{:.1}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_cli_order_overrides_config() {
        let mut config = ConfigFile::default();
        config.history.timestamp_order = TimestampOrder::Reject;
        assert_eq!(resolve_order(None, &config), TimestampOrder::Reject);
        assert_eq!(
            resolve_order(Some(OrderPolicy::Sort), &config),
            TimestampOrder::Sort
        );
    }

    #[test]
    fn test_speed_validation() {
        let config = ConfigFile::default();
        assert_eq!(resolve_speed(None, &config).unwrap(), 1.0);
        assert_eq!(resolve_speed(Some(3.0), &config).unwrap(), 3.0);
        assert!(resolve_speed(Some(0.0), &config).is_err());
    }

    #[test]
    fn test_load_sequence_keeps_custom_events() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"events": [
                {{"type": "getStatus", "event_timestamp": 1.0}},
                {{"type": "reroute", "event_timestamp": 2.0}}
            ]}}"#
        )
        .unwrap();

        let sequence = load_sequence(file.path(), TimestampOrder::PassThrough).unwrap();
        assert_eq!(sequence.len(), 2);
        assert_eq!(sequence.get(1).map(|e| e.event_type()), Some("reroute"));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(3400)), "3.4s");
        assert_eq!(format_duration(Duration::from_secs(123)), "2m 03.0s");
        assert_eq!(format_duration(Duration::from_secs(3723)), "1h 02m 03.0s");
    }
}
