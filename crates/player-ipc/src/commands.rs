//! Commands sent from the host to the player.

use serde::{Deserialize, Serialize};

use crate::types::StartRequest;

/// Commands that the host can send to the player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PlayerCommand {
    /// Start the playback session. Only the first start is honoured.
    Start { request: StartRequest },

    /// Request current player state.
    GetState,

    /// Request a playback statistics snapshot.
    GetStats,

    /// Shut the player down.
    Shutdown,
}
