//! One playback session: demux events in, decoder output to the scheduler.

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{select, Receiver, Sender};
use tracing::{debug, error, info, instrument, warn};

use player_codec::{DecodedFrame, DecoderEvent, VideoDecoder};
use player_demux::{DemuxEvent, Demuxer, TrackInfo};
use player_ipc::{PlayerState, StatusCategory, StatusSink};

use crate::stats::PlaybackStats;
use crate::state::StateCell;

/// Everything a session owns. Built fresh for each start request.
pub(crate) struct Session {
    pub(crate) state: StateCell,
    pub(crate) status: Arc<dyn StatusSink>,
    pub(crate) stats: Arc<PlaybackStats>,
    pub(crate) default_fps: u32,
    pub(crate) demuxer: Box<dyn Demuxer>,
    pub(crate) decoder: Option<Box<dyn VideoDecoder>>,
    pub(crate) frame_tx: Option<Sender<Box<dyn DecodedFrame>>>,
    pub(crate) scheduler: Option<JoinHandle<()>>,
}

impl Session {
    /// Route events until the demuxer and decoder are both done, then
    /// wait for the scheduler to present what is queued.
    #[instrument(name = "session", skip_all)]
    pub(crate) fn run(mut self, demux_rx: Receiver<DemuxEvent>, decoder_rx: Receiver<DecoderEvent>) {
        info!("Session running");
        let mut demux_rx = Some(demux_rx);
        let mut decoder_rx = Some(decoder_rx);
        let mut failed = false;

        while demux_rx.is_some() || decoder_rx.is_some() {
            let demux = demux_rx.clone().unwrap_or_else(crossbeam_channel::never);
            let decoder = decoder_rx.clone().unwrap_or_else(crossbeam_channel::never);

            select! {
                recv(demux) -> event => match event {
                    Ok(event) => {
                        if !self.on_demux_event(event) {
                            failed = true;
                            demux_rx = None;
                        }
                    }
                    Err(_) => {
                        if self.decoder.is_some() {
                            warn!("Demuxer hung up before end of stream");
                            self.drain();
                        }
                        demux_rx = None;
                    }
                },
                recv(decoder) -> event => match event {
                    Ok(event) => self.on_decoder_event(event),
                    Err(_) => decoder_rx = None,
                },
            }
        }

        self.finish(failed);
    }

    /// Returns false once the session has been aborted.
    fn on_demux_event(&mut self, event: DemuxEvent) -> bool {
        match event {
            DemuxEvent::Config(info) => self.configure(info),
            DemuxEvent::Chunk {
                chunk,
                index,
                total,
            } => {
                if self.state.current() == PlayerState::Configuring {
                    self.state.transition_to(PlayerState::Decoding);
                }
                self.stats.record_chunk(total);

                let Some(decoder) = self.decoder.as_mut() else {
                    debug!(index, "Chunk after drain, ignoring");
                    return true;
                };
                if let Err(e) = decoder.decode(chunk) {
                    warn!(index, "Decode failed: {}", e);
                    self.status
                        .report(StatusCategory::Decode, format!("Error: {e}"));
                }
            }
            DemuxEvent::EndOfStream => {
                info!("End of stream");
                self.drain();
            }
            DemuxEvent::Failed { message } => {
                self.abort(message);
                return false;
            }
        }
        true
    }

    fn configure(&mut self, info: TrackInfo) {
        self.state.transition_to(PlayerState::Configuring);

        let config = &info.config;
        info!(
            codec = %config.codec,
            width = config.coded_width,
            height = config.coded_height,
            "Configuring decoder"
        );
        self.status.report(
            StatusCategory::Decode,
            format!(
                "{} @ {}x{}",
                config.codec, config.coded_width, config.coded_height
            ),
        );

        let fps = info
            .estimated_fps
            .filter(|fps| *fps > 0)
            .unwrap_or(self.default_fps);
        self.stats.set_track(info.duration, fps);

        if let Some(decoder) = self.decoder.as_mut() {
            if let Err(e) = decoder.configure(config) {
                warn!("Decoder configuration failed: {}", e);
                self.status
                    .report(StatusCategory::Decode, format!("Error: {e}"));
            }
        }
    }

    fn on_decoder_event(&mut self, event: DecoderEvent) {
        match event {
            DecoderEvent::Frame(frame) => match self.frame_tx.as_ref() {
                Some(tx) => {
                    if let Err(e) = tx.send(frame) {
                        warn!("Scheduler gone, releasing frame");
                        e.into_inner().close();
                    }
                }
                None => frame.close(),
            },
            DecoderEvent::Error(e) => {
                error!("Decoder error: {}", e);
                self.status
                    .report(StatusCategory::Decode, format!("Error: {e}"));
            }
        }
    }

    /// Flush the decoder and release it so its output channel closes.
    fn drain(&mut self) {
        let Some(mut decoder) = self.decoder.take() else {
            return;
        };

        self.state.transition_to(PlayerState::Draining);
        debug!(decoder = decoder.name(), "Flushing decoder");
        if let Err(e) = decoder.flush() {
            warn!("Flush failed: {}", e);
            self.status
                .report(StatusCategory::Decode, format!("Error: {e}"));
        }
        drop(decoder);
        self.demuxer.stop();
    }

    fn abort(&mut self, message: String) {
        error!("Session aborted: {}", message);
        self.decoder = None;
        self.demuxer.stop();
        self.state.transition_to(PlayerState::Failed { message });
    }

    fn finish(&mut self, failed: bool) {
        // Closing the frame channel lets the scheduler drain and exit.
        self.frame_tx = None;
        if let Some(handle) = self.scheduler.take() {
            let _ = handle.join();
        }

        if !failed {
            self.state.transition_to(PlayerState::Idle);
        }
        info!(
            frames = self.stats.frames_presented(),
            "Session finished"
        );
    }
}
