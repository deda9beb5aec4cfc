//! Source fetching and MP4 demuxing.
//!
//! A [`Demuxer`] fetches a source on its own thread and reports what it
//! finds as [`DemuxEvent`]s: one track configuration, one event per
//! encoded chunk, then end of stream.

mod description;
mod error;
#[cfg(test)]
mod fixtures;
mod mp4_demuxer;
mod source;

pub use description::{
    codec_string, find_sample_entry, CodecDescription, CodecFamily, SampleEntry,
};
pub use error::DemuxError;
pub use mp4_demuxer::{demux_buffer, Mp4Demuxer};
pub use source::{fetch, FetchSink, MediaSource};

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use player_codec::{EncodedVideoChunk, VideoDecoderConfig};
use player_ipc::StatusSink;

/// Channel capacity for demux events.
pub const DEMUX_CHANNEL_CAPACITY: usize = 64;

/// Result type for demux operations.
pub type DemuxResult<T> = Result<T, DemuxError>;

/// What the demuxer learned about the video track.
#[derive(Debug, Clone)]
pub struct TrackInfo {
    /// Decoder configuration.
    pub config: VideoDecoderConfig,

    /// Stream duration.
    pub duration: Duration,

    /// Frame rate estimated from sample count and duration.
    pub estimated_fps: Option<u32>,
}

/// Events reported by a demuxer.
#[derive(Debug, Clone)]
pub enum DemuxEvent {
    /// Track configuration. Sent once, before any chunk.
    Config(TrackInfo),

    /// One encoded access unit.
    Chunk {
        /// The chunk.
        chunk: EncodedVideoChunk,

        /// Zero-based position in the stream.
        index: u32,

        /// Total number of chunks in the stream.
        total: u32,
    },

    /// All chunks have been sent.
    EndOfStream,

    /// Demuxing cannot continue.
    Failed {
        /// Error message.
        message: String,
    },
}

/// Trait for demuxers.
pub trait Demuxer: Send {
    /// Begin fetching and demuxing `uri`, reporting on `events`.
    fn start(
        &mut self,
        uri: &str,
        events: Sender<DemuxEvent>,
        status: Arc<dyn StatusSink>,
    ) -> DemuxResult<()>;

    /// Wait for the demuxer to finish.
    fn stop(&mut self);
}

/// Creates a bounded demux event channel.
pub fn demux_channel() -> (Sender<DemuxEvent>, Receiver<DemuxEvent>) {
    crossbeam_channel::bounded(DEMUX_CHANNEL_CAPACITY)
}

/// Estimate a frame rate from a sample count and a duration.
pub fn estimate_fps(sample_count: u32, duration: Duration) -> Option<u32> {
    let secs = duration.as_secs_f64();
    if secs <= 0.0 {
        return None;
    }

    let fps = (sample_count as f64 / secs).round() as u32;
    (fps > 0).then_some(fps)
}
