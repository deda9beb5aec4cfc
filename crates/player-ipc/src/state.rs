//! Player session state machine.

use serde::{Deserialize, Serialize};

/// The lifecycle state of a playback session.
///
/// `Idle → Configuring → Decoding → Draining → Idle`, or `Failed` when
/// session setup is aborted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum PlayerState {
    /// No session in flight.
    #[default]
    Idle,

    /// Track configuration received, decoder being configured.
    Configuring,

    /// Encoded chunks are flowing into the decoder.
    Decoding,

    /// End of stream reached, decoder flushed, queued frames presenting.
    Draining,

    /// The session was aborted.
    Failed {
        /// Error message.
        message: String,
    },
}

impl PlayerState {
    /// Returns true if the player is idle.
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Returns true while a session is in flight.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Configuring | Self::Decoding | Self::Draining)
    }

    /// Returns true if the session was aborted.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Returns a simple string representation of the state.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Configuring => "Configuring",
            Self::Decoding => "Decoding",
            Self::Draining => "Draining",
            Self::Failed { .. } => "Failed",
        }
    }
}
