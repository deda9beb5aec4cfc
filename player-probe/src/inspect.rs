//! Demux a source and summarize it.

use std::fmt;
use std::sync::Arc;

use anyhow::{bail, Context};
use serde::Serialize;
use tracing::info;

use player_demux::{DemuxEvent, Demuxer, Mp4Demuxer};
use player_ipc::{StatusCategory, StatusSink};

/// What the demuxer produced for one source.
#[derive(Debug, Default, Serialize)]
pub struct Summary {
    pub codec: String,
    pub coded_width: u32,
    pub coded_height: u32,
    pub description_bytes: usize,
    pub duration_ms: u128,
    pub estimated_fps: Option<u32>,
    pub chunks: u32,
    pub key_chunks: u32,
    pub total_bytes: usize,
    pub first_timestamp_us: Option<i64>,
    pub last_timestamp_us: Option<i64>,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "codec:       {} @ {}x{}",
            self.codec, self.coded_width, self.coded_height
        )?;
        writeln!(f, "description: {} bytes", self.description_bytes)?;
        writeln!(f, "duration:    {} ms", self.duration_ms)?;
        match self.estimated_fps {
            Some(fps) => writeln!(f, "fps:         {fps}")?,
            None => writeln!(f, "fps:         unknown")?,
        }
        writeln!(
            f,
            "chunks:      {} ({} key, {} bytes)",
            self.chunks, self.key_chunks, self.total_bytes
        )?;
        if let (Some(first), Some(last)) = (self.first_timestamp_us, self.last_timestamp_us) {
            writeln!(f, "timestamps:  {first}us .. {last}us")?;
        }
        Ok(())
    }
}

/// Logs status lines as they arrive.
struct LogSink;

impl StatusSink for LogSink {
    fn report(&self, category: StatusCategory, message: String) {
        info!("[{category}] {message}");
    }
}

/// Fetch and demux `uri`, collecting a summary.
pub fn inspect(uri: &str, chunk_size: usize) -> anyhow::Result<Summary> {
    let (events_tx, events_rx) = player_demux::demux_channel();
    let mut demuxer = Mp4Demuxer::new(chunk_size);
    demuxer
        .start(uri, events_tx, Arc::new(LogSink))
        .with_context(|| format!("Failed to start demuxing {uri}"))?;

    let mut summary = Summary::default();
    let mut ended = false;
    for event in events_rx.iter() {
        match event {
            DemuxEvent::Config(track) => {
                summary.codec = track.config.codec;
                summary.coded_width = track.config.coded_width;
                summary.coded_height = track.config.coded_height;
                summary.description_bytes = track.config.description.map_or(0, |d| d.len());
                summary.duration_ms = track.duration.as_millis();
                summary.estimated_fps = track.estimated_fps;
            }
            DemuxEvent::Chunk { chunk, .. } => {
                summary.chunks += 1;
                if chunk.is_key() {
                    summary.key_chunks += 1;
                }
                summary.total_bytes += chunk.data.len();
                summary.first_timestamp_us.get_or_insert(chunk.timestamp_us);
                summary.last_timestamp_us = Some(chunk.timestamp_us);
            }
            DemuxEvent::EndOfStream => ended = true,
            DemuxEvent::Failed { message } => {
                demuxer.stop();
                bail!("Demuxing failed: {message}");
            }
        }
    }
    demuxer.stop();

    if !ended {
        bail!("Demuxer stopped before end of stream");
    }
    Ok(summary)
}
