//! Video decoder collaborator contract.
//!
//! The player never decodes bitstreams itself. It hands encoded chunks
//! to a [`VideoDecoder`] supplied by the host and receives decoded
//! frames back over a channel, in submission order.

mod error;
mod probe;

pub use error::DecoderError;
pub use probe::{probe_supported_codecs, CodecSupport, PROBE_CODECS};

use bytes::Bytes;
use crossbeam_channel::{Receiver, Sender};

/// Result type for decoder operations.
pub type DecoderResult<T> = Result<T, DecoderError>;

/// Decoder configuration produced by the demuxer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoDecoderConfig {
    /// Codec string, e.g. `avc1.64001f`.
    pub codec: String,

    /// Coded width in pixels.
    pub coded_width: u32,

    /// Coded height in pixels.
    pub coded_height: u32,

    /// Codec-specific description bytes (avcC, hvcC or vpcC payload).
    pub description: Option<Bytes>,
}

impl VideoDecoderConfig {
    /// Create a configuration with a normalized codec string.
    pub fn new(
        codec: &str,
        coded_width: u32,
        coded_height: u32,
        description: Option<Bytes>,
    ) -> Self {
        Self {
            codec: normalize_codec(codec),
            coded_width,
            coded_height,
            description,
        }
    }
}

/// Normalize codec strings decoders reject in their long form.
///
/// Fully qualified VP8 strings (`vp08.00.41.08`) are reduced to `vp8`.
pub fn normalize_codec(codec: &str) -> String {
    if codec.starts_with("vp08") {
        "vp8".to_string()
    } else {
        codec.to_string()
    }
}

/// Whether a chunk can be decoded on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkType {
    /// Sync sample, decodable without references.
    Key,

    /// Depends on earlier chunks.
    Delta,
}

/// One encoded access unit.
#[derive(Debug, Clone)]
pub struct EncodedVideoChunk {
    /// Key or delta.
    pub chunk_type: ChunkType,

    /// Presentation timestamp in microseconds.
    pub timestamp_us: i64,

    /// Duration in microseconds.
    pub duration_us: u64,

    /// Encoded bytes.
    pub data: Bytes,
}

impl EncodedVideoChunk {
    /// Returns true for key chunks.
    pub fn is_key(&self) -> bool {
        self.chunk_type == ChunkType::Key
    }
}

/// A decoded frame owned by the player until released.
///
/// The underlying resource belongs to the decoder. Releasing consumes
/// the frame, so it can happen only once.
pub trait DecodedFrame: Send {
    /// Presentation timestamp in microseconds.
    fn timestamp_us(&self) -> i64;

    /// Display size in pixels.
    fn display_size(&self) -> (u32, u32);

    /// Release the underlying resource.
    fn close(self: Box<Self>);
}

/// Output of a decoder, delivered on the channel given at creation.
pub enum DecoderEvent {
    /// A frame finished decoding.
    Frame(Box<dyn DecodedFrame>),

    /// The decoder hit an error. Further output is not expected.
    Error(DecoderError),
}

impl std::fmt::Debug for DecoderEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Frame(frame) => f
                .debug_struct("Frame")
                .field("timestamp_us", &frame.timestamp_us())
                .finish(),
            Self::Error(e) => f.debug_tuple("Error").field(e).finish(),
        }
    }
}

/// Trait for video decoders.
///
/// Every submitted chunk yields zero or one frame on the output channel,
/// in submission order. Dropping the decoder drops its output sender.
pub trait VideoDecoder: Send {
    /// Configure the decoder. Called once, before any chunk.
    fn configure(&mut self, config: &VideoDecoderConfig) -> DecoderResult<()>;

    /// Submit one chunk.
    fn decode(&mut self, chunk: EncodedVideoChunk) -> DecoderResult<()>;

    /// Emit all pending frames. Returns once they are on the channel.
    fn flush(&mut self) -> DecoderResult<()>;

    /// Get decoder name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Creates decoders and answers capability queries.
pub trait VideoDecoderFactory: Send + Sync {
    /// Create a decoder that reports on `output`.
    fn create(&self, output: Sender<DecoderEvent>) -> DecoderResult<Box<dyn VideoDecoder>>;

    /// Check whether `config` could be decoded.
    fn is_config_supported(&self, config: &VideoDecoderConfig) -> DecoderResult<bool>;
}

/// Creates the channel a decoder reports on.
///
/// Unbounded: a decoder may emit from inside `decode` while the caller
/// is not yet draining.
pub fn decoder_channel() -> (Sender<DecoderEvent>, Receiver<DecoderEvent>) {
    crossbeam_channel::unbounded()
}
