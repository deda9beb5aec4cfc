//! Playback statistics and the render status line.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use tracing::debug;

use player_ipc::PlaybackMetrics;

#[derive(Debug, Default, Clone, Copy)]
struct Track {
    duration_ms: f64,
    configured_fps: f64,
    frame_duration_ms: f64,
}

/// Counters shared between the session and the scheduler.
pub struct PlaybackStats {
    frames_presented: AtomicU64,
    total_frames: AtomicU64,
    track: RwLock<Track>,
    playback_speed: f64,
}

impl PlaybackStats {
    /// Create statistics for a session running at `playback_speed`.
    pub fn new(playback_speed: f64, default_fps: u32) -> Self {
        Self {
            frames_presented: AtomicU64::new(0),
            total_frames: AtomicU64::new(0),
            track: RwLock::new(Track {
                configured_fps: default_fps as f64,
                ..Track::default()
            }),
            playback_speed,
        }
    }

    /// Record the stream duration and frame rate.
    pub fn set_track(&self, duration: Duration, fps: u32) {
        let mut track = self.track.write();
        track.duration_ms = duration.as_secs_f64() * 1000.0;
        track.configured_fps = fps as f64;
        debug!(duration_ms = track.duration_ms, fps, "Track recorded");
    }

    /// Record the announced chunk count.
    pub fn record_chunk(&self, total: u32) {
        self.total_frames.store(total as u64, Ordering::Relaxed);
        if total > 0 {
            let mut track = self.track.write();
            track.frame_duration_ms = track.duration_ms / total as f64;
        }
    }

    /// Count one presented frame. Returns the new count.
    pub fn record_presented(&self) -> u64 {
        self.frames_presented.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Frames presented so far.
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented.load(Ordering::Relaxed)
    }

    /// Total frames announced by the demuxer.
    pub fn total_frames(&self) -> u64 {
        self.total_frames.load(Ordering::Relaxed)
    }

    /// Source time reached after `presented` frames, in milliseconds.
    pub fn position_ms(&self, presented: u64) -> f64 {
        let track = *self.track.read();
        let total = self.total_frames();
        if total > 0 && presented >= total {
            track.duration_ms
        } else {
            (track.frame_duration_ms * presented as f64).round()
        }
    }

    /// Status line for paced presentation.
    pub fn paced_status(&self, presented: u64) -> String {
        let track = *self.track.read();
        format!(
            "{:.1}fps (duration: {:.0}ms/{:.0}ms)",
            track.configured_fps * self.playback_speed,
            self.position_ms(presented),
            track.duration_ms
        )
    }

    /// Status line for immediate presentation at `decode_fps`.
    ///
    /// Reports the same position as paced mode: frames presented times
    /// the frame duration, full duration once the last frame is out. After
    /// the first frame it reads one frame duration.
    pub fn immediate_status(&self, decode_fps: f64, presented: u64) -> String {
        let track = *self.track.read();
        format!(
            "{:.0}fps (duration: {:.0}ms/{:.0}ms)",
            decode_fps,
            self.position_ms(presented),
            track.duration_ms
        )
    }

    /// Get current metrics snapshot.
    pub fn snapshot(&self) -> PlaybackMetrics {
        let track = *self.track.read();
        let frames_presented = self.frames_presented();

        PlaybackMetrics {
            frames_presented,
            total_frames: self.total_frames(),
            configured_fps: track.configured_fps,
            playback_speed: self.playback_speed,
            duration_ms: track.duration_ms,
            position_ms: self.position_ms(frames_presented),
        }
    }
}
