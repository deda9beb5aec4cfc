//! Events sent from the player to the host.

use serde::{Deserialize, Serialize};

use crate::state::PlayerState;
use crate::status::StatusMessage;
use crate::types::PlaybackMetrics;

/// Events that the player can send to the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PlayerEvent {
    /// Player is ready to accept a start request.
    Ready,

    /// Player state has changed.
    StateChanged {
        /// Previous state.
        previous: Box<PlayerState>,

        /// Current state.
        current: Box<PlayerState>,
    },

    /// A batch of status lines, at most one per display refresh.
    Status(StatusMessage),

    /// Playback statistics snapshot.
    Stats(PlaybackMetrics),

    /// A request could not be honoured.
    Error {
        /// Error message.
        message: String,
    },

    /// Player has shut down.
    Shutdown,
}
