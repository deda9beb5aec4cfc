//! MP4 demuxer built on the `mp4` crate.

use std::io::{Cursor, Read, Seek};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use bytes::Bytes;
use crossbeam_channel::Sender;
use mp4::{Mp4Reader, Mp4Sample, TrackType};
use tracing::{debug, error, info, instrument, warn};

use player_codec::{ChunkType, EncodedVideoChunk, VideoDecoderConfig};
use player_ipc::{StatusCategory, StatusSink};

use crate::description::{codec_string, find_sample_entry};
use crate::error::DemuxError;
use crate::source::{fetch, MediaSource};
use crate::{estimate_fps, DemuxEvent, DemuxResult, Demuxer, TrackInfo};

const MICROS_PER_SECOND: i128 = 1_000_000;

/// Demuxes the first video track of an MP4 file.
pub struct Mp4Demuxer {
    fetch_chunk_size: usize,
    worker: Option<JoinHandle<()>>,
}

impl Mp4Demuxer {
    /// Create a demuxer that fetches in reads of `fetch_chunk_size` bytes.
    pub fn new(fetch_chunk_size: usize) -> Self {
        Self {
            fetch_chunk_size,
            worker: None,
        }
    }
}

impl Demuxer for Mp4Demuxer {
    fn start(
        &mut self,
        uri: &str,
        events: Sender<DemuxEvent>,
        status: Arc<dyn StatusSink>,
    ) -> DemuxResult<()> {
        if self.worker.is_some() {
            return Err(DemuxError::AlreadyStarted);
        }

        let source = MediaSource::parse(uri)?;
        let chunk_size = self.fetch_chunk_size;

        info!(?source, "Starting MP4 demuxer");
        let handle = thread::Builder::new()
            .name("mp4-demux".into())
            .spawn(move || demux_worker(source, chunk_size, events, status))?;

        self.worker = Some(handle);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

fn demux_worker(
    source: MediaSource,
    chunk_size: usize,
    events: Sender<DemuxEvent>,
    status: Arc<dyn StatusSink>,
) {
    let data = match fetch(&source, chunk_size, &*status) {
        Ok(data) => data,
        Err(e) => {
            error!("Fetch failed: {}", e);
            status.report(StatusCategory::Fetch, format!("Error: {e}"));
            let _ = events.send(DemuxEvent::Failed {
                message: e.to_string(),
            });
            return;
        }
    };

    match demux_buffer(data, &events, &*status) {
        Ok(()) => {
            let _ = events.send(DemuxEvent::EndOfStream);
        }
        Err(DemuxError::ChannelDisconnected) => {
            debug!("Event receiver gone, demuxer stopping");
        }
        Err(e) => {
            error!("Demux failed: {}", e);
            status.report(StatusCategory::Demux, e.to_string());
            let _ = events.send(DemuxEvent::Failed {
                message: e.to_string(),
            });
        }
    }
}

/// Video track parameters pulled out of the header.
struct VideoTrack {
    id: u32,
    timescale: u32,
    sample_count: u32,
    config: VideoDecoderConfig,
}

fn select_video_track<R: Read + Seek>(
    reader: &Mp4Reader<R>,
    file: &Bytes,
) -> DemuxResult<VideoTrack> {
    let mut tracks: Vec<_> = reader
        .tracks()
        .values()
        .filter(|track| matches!(track.track_type(), Ok(TrackType::Video)))
        .collect();
    tracks.sort_by_key(|track| track.track_id());

    let track = tracks.first().ok_or(DemuxError::NoVideoTrack)?;
    let timescale = track.timescale();
    if timescale == 0 {
        return Err(DemuxError::Parse(format!(
            "track {} has a zero timescale",
            track.track_id()
        )));
    }

    let entry = find_sample_entry(file, track.track_id())?;
    let codec = codec_string(&entry)?;

    Ok(VideoTrack {
        id: track.track_id(),
        timescale,
        sample_count: track.sample_count(),
        config: VideoDecoderConfig::new(
            &codec,
            entry.coded_width,
            entry.coded_height,
            Some(entry.description.bytes),
        ),
    })
}

fn to_micros(ticks: i128, timescale: u32) -> i128 {
    ticks * MICROS_PER_SECOND / timescale as i128
}

fn sample_to_chunk(sample: Mp4Sample, timescale: u32) -> EncodedVideoChunk {
    let composition_time = sample.start_time as i128 + sample.rendering_offset as i128;

    EncodedVideoChunk {
        chunk_type: if sample.is_sync {
            ChunkType::Key
        } else {
            ChunkType::Delta
        },
        timestamp_us: to_micros(composition_time, timescale) as i64,
        duration_us: to_micros(sample.duration as i128, timescale) as u64,
        data: sample.bytes,
    }
}

/// Demux an in-memory MP4, sending config then every chunk on `events`.
///
/// Does not send end of stream; the caller decides when the stream is
/// over.
#[instrument(name = "demux", skip_all, fields(len = data.len()))]
pub fn demux_buffer(
    data: Bytes,
    events: &Sender<DemuxEvent>,
    status: &dyn StatusSink,
) -> DemuxResult<()> {
    let size = data.len() as u64;
    let mut reader = Mp4Reader::read_header(Cursor::new(data.clone()), size)?;

    let track = select_video_track(&reader, &data)?;
    let duration = reader.duration();
    let estimated_fps = estimate_fps(track.sample_count, duration);

    status.report(StatusCategory::Demux, "Ready".to_string());
    info!(
        codec = %track.config.codec,
        width = track.config.coded_width,
        height = track.config.coded_height,
        samples = track.sample_count,
        duration_secs = duration.as_secs_f64(),
        ?estimated_fps,
        "Video track ready"
    );

    events
        .send(DemuxEvent::Config(TrackInfo {
            config: track.config.clone(),
            duration,
            estimated_fps,
        }))
        .map_err(|_| DemuxError::ChannelDisconnected)?;

    // Sample ids are 1-based.
    for sample_id in 1..=track.sample_count {
        let sample = match reader.read_sample(track.id, sample_id)? {
            Some(sample) => sample,
            None => {
                warn!(sample_id, "Sample missing from track");
                continue;
            }
        };

        let chunk = sample_to_chunk(sample, track.timescale);
        events
            .send(DemuxEvent::Chunk {
                chunk,
                index: sample_id - 1,
                total: track.sample_count,
            })
            .map_err(|_| DemuxError::ChannelDisconnected)?;
    }

    debug!(chunks = track.sample_count, "All samples sent");
    Ok(())
}
