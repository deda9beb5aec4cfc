//! Typed host<->player messages for the paced MP4 player.
//!
//! This crate defines the message types exchanged between an embedding
//! host and the player engine, plus the status sink contract shared by
//! the engine and its collaborators.

mod commands;
mod events;
mod state;
mod status;
mod types;

pub use commands::PlayerCommand;
pub use events::PlayerEvent;
pub use state::PlayerState;
pub use status::{StatusCategory, StatusMessage, StatusSink};
pub use types::{CanvasHandle, PlaybackMetrics, PlayerConfig, StartRequest};

use crossbeam_channel::{Receiver, Sender};

/// Channel capacity for commands (host → player).
pub const COMMAND_CHANNEL_CAPACITY: usize = 16;

/// Channel capacity for events (player → host).
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Creates a bounded command channel.
pub fn command_channel() -> (Sender<PlayerCommand>, Receiver<PlayerCommand>) {
    crossbeam_channel::bounded(COMMAND_CHANNEL_CAPACITY)
}

/// Creates a bounded event channel.
pub fn event_channel() -> (Sender<PlayerEvent>, Receiver<PlayerEvent>) {
    crossbeam_channel::bounded(EVENT_CHANNEL_CAPACITY)
}
