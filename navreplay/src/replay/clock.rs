//! Pause-aware playback clock.
//!
//! Maps replay offsets (time since the first recorded event) to wall-clock
//! deadlines. The clock stores the offset reached at its last anchor and,
//! while running, the instant of that anchor:
//!
//! ```text
//! position(now) = base + (now - anchor) * speed
//! deadline(o)   = anchor + (o - base) / speed
//! ```
//!
//! Pausing folds elapsed time into `base`, so resuming continues from the
//! same offset instead of skipping ahead. Uses Tokio's `Instant` so tests can
//! drive it with a paused runtime clock.

use std::time::Duration;

use tokio::time::Instant;

/// Slowest allowed playback speed.
pub const MIN_PLAYBACK_SPEED: f64 = 0.1;

/// Fastest allowed playback speed.
pub const MAX_PLAYBACK_SPEED: f64 = 10.0;

/// Deadline used when an offset cannot be represented.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Replay offset clock.
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    /// Offset reached at `anchor` (or frozen offset while paused).
    base: Duration,
    /// Wall-clock instant `base` was reached; `None` while paused.
    anchor: Option<Instant>,
    /// Playback speed multiplier.
    speed: f64,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackClock {
    /// Create a stopped clock at offset zero and normal speed.
    pub fn new() -> Self {
        Self {
            base: Duration::ZERO,
            anchor: None,
            speed: 1.0,
        }
    }

    /// Check if the clock is running.
    pub fn is_running(&self) -> bool {
        self.anchor.is_some()
    }

    /// Current playback speed.
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Offset reached at `now`.
    pub fn position_at(&self, now: Instant) -> Duration {
        match self.anchor {
            Some(anchor) => {
                let elapsed = now.saturating_duration_since(anchor);
                self.base.saturating_add(scale(elapsed, self.speed))
            }
            None => self.base,
        }
    }

    /// Start or resume at `now`. No effect if already running.
    pub fn play_at(&mut self, now: Instant) {
        if self.anchor.is_none() {
            self.anchor = Some(now);
        }
    }

    /// Freeze the position reached at `now`.
    pub fn pause_at(&mut self, now: Instant) {
        if self.anchor.is_some() {
            self.base = self.position_at(now);
            self.anchor = None;
        }
    }

    /// Jump to `position`, keeping the running state.
    pub fn seek_at(&mut self, position: Duration, now: Instant) {
        self.base = position;
        if self.anchor.is_some() {
            self.anchor = Some(now);
        }
    }

    /// Change speed at `now`, clamped to the supported range.
    ///
    /// The position reached so far is kept; only future progress is scaled.
    pub fn set_speed_at(&mut self, speed: f64, now: Instant) {
        let speed = if speed.is_finite() {
            speed.clamp(MIN_PLAYBACK_SPEED, MAX_PLAYBACK_SPEED)
        } else {
            1.0
        };
        if self.anchor.is_some() {
            self.base = self.position_at(now);
            self.anchor = Some(now);
        }
        self.speed = speed;
    }

    /// Wall-clock instant at which `offset` is reached.
    ///
    /// Offsets already passed map to the anchor (a past instant). Returns
    /// `None` while paused.
    pub fn deadline_for(&self, offset: Duration) -> Option<Instant> {
        let anchor = self.anchor?;
        let remaining = offset.saturating_sub(self.base);
        let wall = unscale(remaining, self.speed);
        Some(
            anchor
                .checked_add(wall)
                .unwrap_or_else(|| anchor + FAR_FUTURE),
        )
    }

    /// Stop and rewind to zero. Speed is kept.
    pub fn reset(&mut self) {
        self.base = Duration::ZERO;
        self.anchor = None;
    }
}

fn scale(elapsed: Duration, speed: f64) -> Duration {
    Duration::try_from_secs_f64(elapsed.as_secs_f64() * speed).unwrap_or(Duration::MAX)
}

fn unscale(offset: Duration, speed: f64) -> Duration {
    if speed == 1.0 {
        return offset;
    }
    Duration::try_from_secs_f64(offset.as_secs_f64() / speed).unwrap_or(FAR_FUTURE)
}
