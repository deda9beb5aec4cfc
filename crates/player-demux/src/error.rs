//! Error types for the demux module.

use thiserror::Error;

/// Errors that can occur while fetching or demuxing a source.
#[derive(Debug, Error)]
pub enum DemuxError {
    /// The source location could not be parsed.
    #[error("Invalid source location: {0}")]
    InvalidUri(String),

    /// The source scheme is not supported.
    #[error("Unsupported source scheme: {0}")]
    UnsupportedSource(String),

    /// Fetching over the network failed.
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The container could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The file has no video track.
    #[error("No video track found")]
    NoVideoTrack,

    /// No codec description box in the sample description.
    #[error("avcC, hvcC, vpcC, or av1C box not found")]
    MissingDescription,

    /// A codec description box is malformed.
    #[error("Invalid codec description: {0}")]
    InvalidDescription(String),

    /// Demuxing already started.
    #[error("Demuxer already started")]
    AlreadyStarted,

    /// The event receiver hung up.
    #[error("Event channel disconnected")]
    ChannelDisconnected,
}

impl From<mp4::Error> for DemuxError {
    fn from(err: mp4::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<ureq::Error> for DemuxError {
    fn from(err: ureq::Error) -> Self {
        Self::Fetch(err.to_string())
    }
}
