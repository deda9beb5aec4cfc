//! Coalesced status reporting.
//!
//! Reporters overwrite a shared pending message. A ticker thread wakes
//! only when that message goes from empty to non-empty, waits for the
//! next refresh boundary and emits everything pending as one event.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use tracing::{debug, warn};

use player_ipc::{PlayerEvent, StatusCategory, StatusMessage, StatusSink};

use crate::clock::Clock;
use crate::PlayerResult;

/// Collects status lines until the next refresh tick.
#[derive(Clone)]
pub struct StatusReporter {
    pending: Arc<Mutex<Option<StatusMessage>>>,
    tick_tx: Sender<()>,
}

impl StatusReporter {
    /// Create a reporter and the receiver its ticker waits on.
    pub fn new() -> (Self, Receiver<()>) {
        let (tick_tx, tick_rx) = crossbeam_channel::bounded(1);
        let reporter = Self {
            pending: Arc::new(Mutex::new(None)),
            tick_tx,
        };
        (reporter, tick_rx)
    }

    /// Take the pending message, leaving the buffer empty.
    pub fn take_pending(&self) -> Option<StatusMessage> {
        self.pending.lock().take()
    }
}

impl StatusSink for StatusReporter {
    fn report(&self, category: StatusCategory, message: String) {
        let mut pending = self.pending.lock();
        match pending.as_mut() {
            Some(batch) => batch.set(category, message),
            None => {
                let mut batch = StatusMessage::new();
                batch.set(category, message);
                *pending = Some(batch);

                // A tick is already owed if the slot is full.
                if let Err(TrySendError::Disconnected(())) = self.tick_tx.try_send(()) {
                    debug!("Status ticker gone");
                }
            }
        }
    }
}

/// Refresh-interval thread that emits pending status.
pub struct StatusTicker {
    handle: Option<JoinHandle<()>>,
    should_stop: Arc<AtomicBool>,
}

impl StatusTicker {
    /// Spawn the ticker. `refresh_hz` of zero is treated as one.
    pub fn spawn(
        reporter: StatusReporter,
        tick_rx: Receiver<()>,
        refresh_hz: u32,
        clock: Arc<dyn Clock>,
        event_tx: Sender<PlayerEvent>,
    ) -> PlayerResult<Self> {
        let interval = Duration::from_nanos(1_000_000_000 / refresh_hz.max(1) as u64);
        let should_stop = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&should_stop);

        let handle = thread::Builder::new()
            .name("status-ticker".into())
            .spawn(move || ticker_loop(reporter, tick_rx, interval, clock, event_tx, stop))?;

        Ok(Self {
            handle: Some(handle),
            should_stop,
        })
    }

    /// Stop the ticker, emitting anything still pending.
    pub fn stop(&mut self) {
        self.should_stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for StatusTicker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn ticker_loop(
    reporter: StatusReporter,
    tick_rx: Receiver<()>,
    interval: Duration,
    clock: Arc<dyn Clock>,
    event_tx: Sender<PlayerEvent>,
    should_stop: Arc<AtomicBool>,
) {
    let origin = clock.now();

    while !should_stop.load(Ordering::SeqCst) {
        match tick_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(()) => {
                clock.sleep_until(next_refresh(origin, clock.now(), interval));
                emit(&reporter, &event_tx);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    emit(&reporter, &event_tx);
}

fn emit(reporter: &StatusReporter, event_tx: &Sender<PlayerEvent>) {
    if let Some(message) = reporter.take_pending() {
        if let Err(e) = event_tx.try_send(PlayerEvent::Status(message)) {
            warn!("Failed to send status: {}", e);
        }
    }
}

/// First refresh boundary strictly after `now`.
fn next_refresh(origin: Instant, now: Instant, interval: Duration) -> Instant {
    let interval_ns = interval.as_nanos().max(1);
    let elapsed_ns = now.saturating_duration_since(origin).as_nanos();
    let ticks = elapsed_ns / interval_ns + 1;
    origin + Duration::from_nanos((ticks * interval_ns) as u64)
}
