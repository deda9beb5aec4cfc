//! Error types for the player.

use thiserror::Error;

use player_codec::DecoderError;
use player_demux::DemuxError;
use player_render::RenderError;

/// Errors that can occur while starting a session.
#[derive(Debug, Error)]
pub enum PlayerError {
    /// The player has already accepted its start request.
    #[error("Session already started")]
    AlreadyStarted,

    /// Playback speed is negative or not a number.
    #[error("Invalid playback speed: {0}")]
    InvalidPlaybackSpeed(f64),

    /// Renderer selection failed.
    #[error("Renderer error: {0}")]
    Render(#[from] RenderError),

    /// Decoder creation failed.
    #[error("Decoder error: {0}")]
    Decoder(#[from] DecoderError),

    /// Demuxer start failed.
    #[error("Demux error: {0}")]
    Demux(#[from] DemuxError),

    /// A worker thread could not be spawned.
    #[error("Failed to spawn thread: {0}")]
    Spawn(#[from] std::io::Error),
}
