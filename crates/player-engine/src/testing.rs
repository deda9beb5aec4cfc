//! Recording collaborators shared by the engine tests.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bytes::Bytes;
use crossbeam_channel::Sender;
use parking_lot::Mutex;

use player_codec::{
    ChunkType, DecodedFrame, DecoderError, DecoderEvent, DecoderResult, EncodedVideoChunk,
    VideoDecoder, VideoDecoderConfig, VideoDecoderFactory,
};
use player_demux::{DemuxEvent, DemuxResult, Demuxer, TrackInfo};
use player_ipc::{CanvasHandle, StatusCategory, StatusSink};
use player_render::{RenderResult, Renderer, RendererFactory, RendererKind};

use crate::clock::Clock;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Configure(String),
    Decode(i64),
    Flush,
    Draw(i64, Instant),
    Release(i64),
}

/// Ordered log of collaborator calls.
#[derive(Clone, Default)]
pub(crate) struct Journal(Arc<Mutex<Vec<Call>>>);

impl Journal {
    pub(crate) fn push(&self, call: Call) {
        self.0.lock().push(call);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.0.lock().clone()
    }

    pub(crate) fn draws(&self) -> Vec<i64> {
        self.draw_times().into_iter().map(|(ts, _)| ts).collect()
    }

    pub(crate) fn draw_times(&self) -> Vec<(i64, Instant)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Draw(ts, at) => Some((ts, at)),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn releases(&self) -> Vec<i64> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Release(ts) => Some(ts),
                _ => None,
            })
            .collect()
    }

    /// Calls with draw times stripped, for order checks.
    pub(crate) fn sequence(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| !matches!(call, Call::Draw(..)))
            .collect()
    }
}

pub(crate) struct MockFrame {
    timestamp_us: i64,
    journal: Journal,
}

impl MockFrame {
    pub(crate) fn boxed(timestamp_us: i64, journal: &Journal) -> Box<dyn DecodedFrame> {
        Box::new(Self {
            timestamp_us,
            journal: journal.clone(),
        })
    }
}

impl DecodedFrame for MockFrame {
    fn timestamp_us(&self) -> i64 {
        self.timestamp_us
    }

    fn display_size(&self) -> (u32, u32) {
        (320, 240)
    }

    fn close(self: Box<Self>) {
        self.journal.push(Call::Release(self.timestamp_us));
    }
}

pub(crate) struct MockRenderer {
    kind: RendererKind,
    journal: Journal,
    clock: Arc<dyn Clock>,
    draw_cost: Duration,
}

impl Renderer for MockRenderer {
    fn draw(&mut self, frame: &dyn DecodedFrame) {
        let now = self.clock.now();
        self.journal.push(Call::Draw(frame.timestamp_us(), now));
        if !self.draw_cost.is_zero() {
            self.clock.sleep_until(now + self.draw_cost);
        }
    }

    fn kind(&self) -> RendererKind {
        self.kind
    }
}

pub(crate) struct MockRendererFactory {
    pub(crate) journal: Journal,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) draw_cost: Duration,
}

impl MockRendererFactory {
    pub(crate) fn renderer(&self) -> Box<dyn Renderer> {
        Box::new(MockRenderer {
            kind: RendererKind::Canvas2d,
            journal: self.journal.clone(),
            clock: Arc::clone(&self.clock),
            draw_cost: self.draw_cost,
        })
    }
}

impl RendererFactory for MockRendererFactory {
    fn create(&self, kind: RendererKind, _canvas: CanvasHandle) -> RenderResult<Box<dyn Renderer>> {
        Ok(Box::new(MockRenderer {
            kind,
            journal: self.journal.clone(),
            clock: Arc::clone(&self.clock),
            draw_cost: self.draw_cost,
        }))
    }
}

pub(crate) struct MockDecoder {
    output: Sender<DecoderEvent>,
    journal: Journal,
    supported: Vec<String>,
    hold_until_flush: bool,
    held: Vec<i64>,
    configured: bool,
}

impl MockDecoder {
    fn emit(&self, timestamp_us: i64) {
        let _ = self
            .output
            .send(DecoderEvent::Frame(MockFrame::boxed(timestamp_us, &self.journal)));
    }
}

impl VideoDecoder for MockDecoder {
    fn configure(&mut self, config: &VideoDecoderConfig) -> DecoderResult<()> {
        self.journal.push(Call::Configure(config.codec.clone()));
        if !self.supported.contains(&config.codec) {
            return Err(DecoderError::UnsupportedConfig(config.codec.clone()));
        }
        self.configured = true;
        Ok(())
    }

    fn decode(&mut self, chunk: EncodedVideoChunk) -> DecoderResult<()> {
        self.journal.push(Call::Decode(chunk.timestamp_us));
        if !self.configured {
            let _ = self.output.send(DecoderEvent::Error(DecoderError::NotConfigured));
            return Ok(());
        }
        if self.hold_until_flush {
            self.held.push(chunk.timestamp_us);
        } else {
            self.emit(chunk.timestamp_us);
        }
        Ok(())
    }

    fn flush(&mut self) -> DecoderResult<()> {
        self.journal.push(Call::Flush);
        for timestamp_us in std::mem::take(&mut self.held) {
            self.emit(timestamp_us);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

pub(crate) struct MockDecoderFactory {
    pub(crate) journal: Journal,
    pub(crate) supported: Vec<String>,
    pub(crate) hold_until_flush: bool,
}

impl VideoDecoderFactory for MockDecoderFactory {
    fn create(&self, output: Sender<DecoderEvent>) -> DecoderResult<Box<dyn VideoDecoder>> {
        Ok(Box::new(MockDecoder {
            output,
            journal: self.journal.clone(),
            supported: self.supported.clone(),
            hold_until_flush: self.hold_until_flush,
            held: Vec::new(),
            configured: false,
        }))
    }

    fn is_config_supported(&self, config: &VideoDecoderConfig) -> DecoderResult<bool> {
        Ok(self.supported.contains(&config.codec))
    }
}

/// Sends a fixed list of events from a worker thread.
pub(crate) struct ScriptedDemuxer {
    script: Vec<DemuxEvent>,
    worker: Option<JoinHandle<()>>,
}

impl ScriptedDemuxer {
    pub(crate) fn new(script: Vec<DemuxEvent>) -> Self {
        Self {
            script,
            worker: None,
        }
    }
}

impl Demuxer for ScriptedDemuxer {
    fn start(
        &mut self,
        _uri: &str,
        events: Sender<DemuxEvent>,
        status: Arc<dyn StatusSink>,
    ) -> DemuxResult<()> {
        let script = std::mem::take(&mut self.script);
        self.worker = Some(thread::spawn(move || {
            status.report(StatusCategory::Demux, "Ready".into());
            for event in script {
                if events.send(event).is_err() {
                    break;
                }
            }
        }));
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Status sink that keeps every report.
#[derive(Default)]
pub(crate) struct RecordingSink(Mutex<Vec<(StatusCategory, String)>>);

impl RecordingSink {
    pub(crate) fn lines(&self, category: StatusCategory) -> Vec<String> {
        self.0
            .lock()
            .iter()
            .filter(|(c, _)| *c == category)
            .map(|(_, line)| line.clone())
            .collect()
    }
}

impl StatusSink for RecordingSink {
    fn report(&self, category: StatusCategory, message: String) {
        self.0.lock().push((category, message));
    }
}

/// Config event for a `frames`-long clip at 25 fps.
pub(crate) fn config_event(codec: &str, frames: u32) -> DemuxEvent {
    DemuxEvent::Config(TrackInfo {
        config: VideoDecoderConfig::new(codec, 320, 240, None),
        duration: Duration::from_millis(40 * frames as u64),
        estimated_fps: Some(25),
    })
}

/// Chunk events at 40 ms spacing.
pub(crate) fn chunk_events(frames: u32) -> Vec<DemuxEvent> {
    (0..frames)
        .map(|index| DemuxEvent::Chunk {
            chunk: EncodedVideoChunk {
                chunk_type: if index == 0 {
                    ChunkType::Key
                } else {
                    ChunkType::Delta
                },
                timestamp_us: index as i64 * 40_000,
                duration_us: 40_000,
                data: Bytes::from_static(&[0, 0, 0, 1]),
            },
            index,
            total: frames,
        })
        .collect()
}
