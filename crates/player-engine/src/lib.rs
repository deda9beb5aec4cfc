//! Playback orchestrator and frame scheduler.
//!
//! This crate wires a demuxer, a decoder and a renderer together and
//! presents decoded frames either as fast as they decode or paced to a
//! playback-rate multiplier.

mod clock;
mod error;
mod orchestrator;
mod pacing;
mod scheduler;
mod session;
mod state;
mod stats;
mod status;
#[cfg(test)]
mod testing;

pub use clock::{Clock, SystemClock};
pub use error::PlayerError;
pub use orchestrator::{Collaborators, Player};
pub use pacing::{PacingMode, PacingTimeline, PlaybackRate};
pub use scheduler::{FrameRecord, FrameScheduler};
pub use stats::PlaybackStats;
pub use status::{StatusReporter, StatusTicker};

use crossbeam_channel::{Receiver, Sender};

use player_codec::DecodedFrame;
use player_ipc::{PlayerCommand, PlayerConfig, PlayerEvent};

/// Channel capacity for decoded frames on their way to the scheduler.
pub const FRAME_CHANNEL_CAPACITY: usize = 8;

/// Result type for player operations.
pub type PlayerResult<T> = Result<T, PlayerError>;

/// Create a player with default configuration.
pub fn create_player(
    command_rx: Receiver<PlayerCommand>,
    event_tx: Sender<PlayerEvent>,
    collaborators: Collaborators,
) -> Player {
    Player::new(command_rx, event_tx, collaborators, PlayerConfig::default())
}

/// Creates the channel that feeds the frame scheduler.
pub fn frame_channel() -> (Sender<Box<dyn DecodedFrame>>, Receiver<Box<dyn DecodedFrame>>) {
    crossbeam_channel::bounded(FRAME_CHANNEL_CAPACITY)
}
