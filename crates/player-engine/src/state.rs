//! Shared player state and event emission.

use std::sync::Arc;

use crossbeam_channel::Sender;
use parking_lot::RwLock;
use tracing::{debug, warn};

use player_ipc::{PlayerEvent, PlayerState};

/// Player state plus the channel its transitions are announced on.
#[derive(Clone)]
pub(crate) struct StateCell {
    state: Arc<RwLock<PlayerState>>,
    event_tx: Sender<PlayerEvent>,
}

impl StateCell {
    pub(crate) fn new(event_tx: Sender<PlayerEvent>) -> Self {
        Self {
            state: Arc::new(RwLock::new(PlayerState::Idle)),
            event_tx,
        }
    }

    pub(crate) fn current(&self) -> PlayerState {
        self.state.read().clone()
    }

    pub(crate) fn transition_to(&self, new_state: PlayerState) {
        let previous = {
            let mut state = self.state.write();
            if *state == new_state {
                return;
            }
            std::mem::replace(&mut *state, new_state.clone())
        };

        debug!(
            previous = %previous.name(),
            current = %new_state.name(),
            "State transition"
        );

        self.send_event(PlayerEvent::StateChanged {
            previous: Box::new(previous),
            current: Box::new(new_state),
        });
    }

    pub(crate) fn event_sender(&self) -> Sender<PlayerEvent> {
        self.event_tx.clone()
    }

    pub(crate) fn send_event(&self, event: PlayerEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            warn!("Failed to send event: {}", e);
        }
    }
}
