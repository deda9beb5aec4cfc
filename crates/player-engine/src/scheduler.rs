//! Frame presentation.
//!
//! In paced mode frames wait in a FIFO queue and are drawn when the
//! pacing timeline says they are due. In immediate mode they are drawn
//! on arrival.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{Receiver, TryRecvError};
use tracing::{debug, info, instrument};

use player_codec::DecodedFrame;
use player_ipc::{StatusCategory, StatusSink};
use player_render::{Renderer, RendererKind};

use crate::clock::Clock;
use crate::pacing::{PacingMode, PacingTimeline, PlaybackRate};
use crate::stats::PlaybackStats;

/// A decoded frame waiting for presentation.
pub struct FrameRecord {
    frame: Box<dyn DecodedFrame>,
    timestamp_us: i64,
}

impl FrameRecord {
    /// Wrap a frame, capturing its timestamp.
    pub fn new(frame: Box<dyn DecodedFrame>) -> Self {
        let timestamp_us = frame.timestamp_us();
        Self {
            frame,
            timestamp_us,
        }
    }

    /// Presentation timestamp in microseconds.
    pub fn timestamp_us(&self) -> i64 {
        self.timestamp_us
    }
}

/// Presents decoded frames to a renderer.
pub struct FrameScheduler {
    mode: PacingMode,
    renderer: Box<dyn Renderer>,
    clock: Arc<dyn Clock>,
    status: Arc<dyn StatusSink>,
    stats: Arc<PlaybackStats>,
    queue: VecDeque<FrameRecord>,
    timeline: Option<PacingTimeline>,
    first_presented_at: Option<Instant>,
}

impl FrameScheduler {
    /// Create a scheduler for one session.
    pub fn new(
        mode: PacingMode,
        renderer: Box<dyn Renderer>,
        clock: Arc<dyn Clock>,
        status: Arc<dyn StatusSink>,
        stats: Arc<PlaybackStats>,
    ) -> Self {
        Self {
            mode,
            renderer,
            clock,
            status,
            stats,
            queue: VecDeque::new(),
            timeline: None,
            first_presented_at: None,
        }
    }

    /// Hand over a decoded frame.
    pub fn submit(&mut self, frame: Box<dyn DecodedFrame>) {
        match self.mode {
            PacingMode::Immediate => self.present_immediately(frame),
            PacingMode::Paced(rate) => self.enqueue(FrameRecord::new(frame), rate),
        }
    }

    /// When the head of the queue is due, if playback is in progress.
    pub fn next_deadline(&self) -> Option<Instant> {
        let timeline = self.timeline.as_ref()?;
        let head = self.queue.front()?;
        Some(timeline.target(head.timestamp_us))
    }

    /// Draw and release the head of the queue. Returns false if empty.
    pub fn present_next(&mut self) -> bool {
        let Some(record) = self.queue.pop_front() else {
            return false;
        };

        let presented = self.stats.record_presented();
        self.draw_and_release(record.frame);
        self.status
            .report(StatusCategory::Render, self.stats.paced_status(presented));
        true
    }

    /// Backend of the renderer frames are drawn with.
    pub fn renderer_kind(&self) -> RendererKind {
        self.renderer.kind()
    }

    /// Whether a pacing timeline is active.
    pub fn is_playing(&self) -> bool {
        self.timeline.is_some()
    }

    /// Frames waiting for presentation.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Present frames from `frames` until it closes and the queue drains.
    #[instrument(name = "frame_scheduler", skip_all, fields(mode = ?self.mode))]
    pub fn run(mut self, frames: Receiver<Box<dyn DecodedFrame>>) {
        info!(renderer = %self.renderer_kind(), "Frame scheduler running");
        let mut open = true;

        loop {
            // Pick up everything that arrived while waiting.
            while open {
                match frames.try_recv() {
                    Ok(frame) => self.submit(frame),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => open = false,
                }
            }

            if let Some(deadline) = self.next_deadline() {
                self.clock.sleep_until(deadline);
                self.present_next();
                continue;
            }

            self.stop_playback();
            if !open {
                break;
            }

            match frames.recv() {
                Ok(frame) => self.submit(frame),
                Err(_) => open = false,
            }
        }

        info!(
            frames = self.stats.frames_presented(),
            "Frame scheduler finished"
        );
    }

    fn enqueue(&mut self, record: FrameRecord, rate: PlaybackRate) {
        if self.timeline.is_none() {
            debug!(first_timestamp_us = record.timestamp_us, "Playback started");
            self.timeline = Some(PacingTimeline::start(
                self.clock.now(),
                record.timestamp_us,
                rate,
            ));
        }
        self.queue.push_back(record);
    }

    fn stop_playback(&mut self) {
        if self.timeline.take().is_some() {
            debug!("Queue drained, playback stopped");
        }
    }

    fn present_immediately(&mut self, frame: Box<dyn DecodedFrame>) {
        let now = self.clock.now();
        let presented = self.stats.record_presented();
        let decode_fps = match self.first_presented_at {
            None => {
                self.first_presented_at = Some(now);
                0.0
            }
            Some(first) => {
                let elapsed = now.saturating_duration_since(first).as_secs_f64();
                if elapsed > 0.0 {
                    (presented - 1) as f64 / elapsed
                } else {
                    0.0
                }
            }
        };

        self.draw_and_release(frame);
        self.status.report(
            StatusCategory::Render,
            self.stats.immediate_status(decode_fps, presented),
        );
    }

    fn draw_and_release(&mut self, frame: Box<dyn DecodedFrame>) {
        self.renderer.draw(&*frame);
        frame.close();
    }
}

impl Drop for FrameScheduler {
    fn drop(&mut self) {
        if !self.queue.is_empty() {
            debug!(frames = self.queue.len(), "Releasing undrawn frames");
        }
        for record in self.queue.drain(..) {
            record.frame.close();
        }
    }
}
