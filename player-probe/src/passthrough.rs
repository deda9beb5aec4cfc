//! Collaborators that move timing through the engine without pixels.

use std::sync::Arc;

use crossbeam_channel::Sender;
use tracing::debug;

use player_codec::{
    DecodedFrame, DecoderError, DecoderEvent, DecoderResult, EncodedVideoChunk, VideoDecoder,
    VideoDecoderConfig, VideoDecoderFactory,
};
use player_ipc::CanvasHandle;
use player_render::{RenderResult, Renderer, RendererFactory, RendererKind};

/// A frame that carries only its timestamp and size.
struct TimingFrame {
    timestamp_us: i64,
    size: (u32, u32),
}

impl DecodedFrame for TimingFrame {
    fn timestamp_us(&self) -> i64 {
        self.timestamp_us
    }

    fn display_size(&self) -> (u32, u32) {
        self.size
    }

    fn close(self: Box<Self>) {}
}

/// Turns every chunk into a [`TimingFrame`].
struct PassthroughDecoder {
    output: Sender<DecoderEvent>,
    size: Option<(u32, u32)>,
}

impl VideoDecoder for PassthroughDecoder {
    fn configure(&mut self, config: &VideoDecoderConfig) -> DecoderResult<()> {
        self.size = Some((config.coded_width, config.coded_height));
        Ok(())
    }

    fn decode(&mut self, chunk: EncodedVideoChunk) -> DecoderResult<()> {
        let size = self.size.ok_or(DecoderError::NotConfigured)?;
        let frame = TimingFrame {
            timestamp_us: chunk.timestamp_us,
            size,
        };
        self.output
            .send(DecoderEvent::Frame(Box::new(frame)))
            .map_err(|_| DecoderError::Closed)
    }

    fn flush(&mut self) -> DecoderResult<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "passthrough"
    }
}

struct PassthroughFactory;

impl VideoDecoderFactory for PassthroughFactory {
    fn create(&self, output: Sender<DecoderEvent>) -> DecoderResult<Box<dyn VideoDecoder>> {
        Ok(Box::new(PassthroughDecoder { output, size: None }))
    }

    fn is_config_supported(&self, _config: &VideoDecoderConfig) -> DecoderResult<bool> {
        Ok(true)
    }
}

struct LogRenderer {
    kind: RendererKind,
}

impl Renderer for LogRenderer {
    fn draw(&mut self, frame: &dyn DecodedFrame) {
        let (width, height) = frame.display_size();
        debug!(
            renderer = %self.kind,
            timestamp_us = frame.timestamp_us(),
            width,
            height,
            "Draw"
        );
    }

    fn kind(&self) -> RendererKind {
        self.kind
    }
}

struct LogRendererFactory;

impl RendererFactory for LogRendererFactory {
    fn create(&self, kind: RendererKind, _canvas: CanvasHandle) -> RenderResult<Box<dyn Renderer>> {
        Ok(Box::new(LogRenderer { kind }))
    }
}

pub fn decoder_factory() -> Arc<dyn VideoDecoderFactory> {
    Arc::new(PassthroughFactory)
}

pub fn renderer_factory() -> Arc<dyn RendererFactory> {
    Arc::new(LogRendererFactory)
}
