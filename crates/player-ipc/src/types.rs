//! Common types used across IPC messages.

use serde::{Deserialize, Serialize};

/// Opaque handle to the drawing surface a renderer targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanvasHandle(pub u64);

/// The session start request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    /// Source media location (path, `file://` or `http(s)://` URL).
    pub data_uri: String,

    /// Rendering backend name: `2d`, `webgl`, `webgl2` or `webgpu`.
    pub renderer_name: String,

    /// Target drawing surface.
    pub canvas: CanvasHandle,

    /// Playback-rate multiplier. `0` draws frames as they decode.
    #[serde(default)]
    pub playback_speed: f64,
}

/// Engine-wide settings that do not change between sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Display refresh rate that bounds status emission.
    pub status_refresh_hz: u32,

    /// Frame rate assumed when the container does not provide one.
    pub default_fps: u32,

    /// Read size used while fetching the source.
    pub fetch_chunk_size: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            status_refresh_hz: 60,
            default_fps: 30,
            fetch_chunk_size: 64 * 1024,
        }
    }
}

/// Playback statistics snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaybackMetrics {
    /// Frames drawn so far.
    pub frames_presented: u64,

    /// Total frames announced by the demuxer.
    pub total_frames: u64,

    /// Frame rate of the source.
    pub configured_fps: f64,

    /// Configured playback-rate multiplier.
    pub playback_speed: f64,

    /// Stream duration in milliseconds.
    pub duration_ms: f64,

    /// Position reached, in milliseconds of source time.
    pub position_ms: f64,
}
