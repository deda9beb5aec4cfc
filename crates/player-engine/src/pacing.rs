//! Mapping frame timestamps onto wall-clock presentation times.

use std::time::{Duration, Instant};

use crate::error::PlayerError;
use crate::PlayerResult;

/// A playback-rate multiplier. Always finite and greater than zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackRate(f64);

impl PlaybackRate {
    /// Returns `None` unless `speed` is finite and positive.
    pub fn new(speed: f64) -> Option<Self> {
        (speed.is_finite() && speed > 0.0).then_some(Self(speed))
    }

    /// The multiplier.
    pub fn get(self) -> f64 {
        self.0
    }
}

/// How decoded frames are presented.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PacingMode {
    /// Draw each frame as soon as it decodes.
    Immediate,

    /// Draw each frame at its timestamp scaled by the rate.
    Paced(PlaybackRate),
}

impl PacingMode {
    /// Select the mode for a requested playback speed.
    ///
    /// Zero selects [`PacingMode::Immediate`]. Negative and non-finite
    /// speeds are rejected.
    pub fn from_speed(speed: f64) -> PlayerResult<Self> {
        if speed == 0.0 {
            return Ok(Self::Immediate);
        }

        PlaybackRate::new(speed)
            .map(Self::Paced)
            .ok_or(PlayerError::InvalidPlaybackSpeed(speed))
    }

    /// The speed this mode was built from.
    pub fn speed(self) -> f64 {
        match self {
            Self::Immediate => 0.0,
            Self::Paced(rate) => rate.get(),
        }
    }
}

/// Anchors one playback session to the wall clock.
///
/// Built when the first frame of a session is enqueued.
#[derive(Debug, Clone, Copy)]
pub struct PacingTimeline {
    started_at: Instant,
    first_timestamp_us: i64,
    rate: PlaybackRate,
}

impl PacingTimeline {
    /// Start a timeline at `now` for a frame stamped `first_timestamp_us`.
    pub fn start(now: Instant, first_timestamp_us: i64, rate: PlaybackRate) -> Self {
        Self {
            started_at: now,
            first_timestamp_us,
            rate,
        }
    }

    /// When the frame stamped `timestamp_us` is due.
    ///
    /// Frames stamped before the first frame are due at once.
    pub fn target(&self, timestamp_us: i64) -> Instant {
        let relative_us = timestamp_us.saturating_sub(self.first_timestamp_us);
        if relative_us <= 0 {
            return self.started_at;
        }

        let nanos = (relative_us as f64 * 1000.0 / self.rate.get()).round();
        self.started_at + Duration::from_nanos(nanos as u64)
    }
}
