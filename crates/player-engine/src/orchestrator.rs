//! Main player orchestrator.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, error, info, instrument, warn};

use player_codec::{decoder_channel, probe_supported_codecs, VideoDecoderFactory};
use player_demux::{demux_channel, Demuxer};
use player_ipc::{
    PlayerCommand, PlayerConfig, PlayerEvent, PlayerState, StartRequest, StatusSink,
};
use player_render::{RendererFactory, RendererKind};

use crate::clock::{Clock, SystemClock};
use crate::error::PlayerError;
use crate::pacing::PacingMode;
use crate::scheduler::FrameScheduler;
use crate::session::Session;
use crate::state::StateCell;
use crate::stats::PlaybackStats;
use crate::status::{StatusReporter, StatusTicker};
use crate::PlayerResult;

/// The demuxing, decoding and rendering collaborators of a player.
pub struct Collaborators {
    /// Produces track configuration and encoded chunks.
    pub demuxer: Box<dyn Demuxer>,

    /// Creates the session decoder.
    pub decoders: Arc<dyn VideoDecoderFactory>,

    /// Creates the session renderer.
    pub renderers: Arc<dyn RendererFactory>,
}

/// The playback orchestrator.
///
/// Accepts exactly one start request. The session runs on its own
/// thread; the scheduler presents frames on another.
pub struct Player {
    command_rx: Receiver<PlayerCommand>,
    state: StateCell,
    config: PlayerConfig,
    clock: Arc<dyn Clock>,
    collaborators: Option<Collaborators>,
    reporter: StatusReporter,
    tick_rx: Option<Receiver<()>>,
    ticker: Option<StatusTicker>,
    stats: Option<Arc<PlaybackStats>>,
    session_thread: Option<JoinHandle<()>>,
}

impl Player {
    /// Create a new player.
    pub fn new(
        command_rx: Receiver<PlayerCommand>,
        event_tx: Sender<PlayerEvent>,
        collaborators: Collaborators,
        config: PlayerConfig,
    ) -> Self {
        let (reporter, tick_rx) = StatusReporter::new();
        Self {
            command_rx,
            state: StateCell::new(event_tx),
            config,
            clock: Arc::new(SystemClock),
            collaborators: Some(collaborators),
            reporter,
            tick_rx: Some(tick_rx),
            ticker: None,
            stats: None,
            session_thread: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> PlayerState {
        self.state.current()
    }

    /// Run the player (blocking).
    #[instrument(name = "player_run", skip(self))]
    pub fn run(&mut self) {
        info!("Player starting");
        self.state.send_event(PlayerEvent::Ready);

        loop {
            match self.command_rx.recv_timeout(Duration::from_millis(100)) {
                Ok(command) => {
                    if !self.handle_command(command) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => self.reap_session(),
                Err(RecvTimeoutError::Disconnected) => {
                    info!("Command channel disconnected, shutting down");
                    self.shutdown();
                    break;
                }
            }
        }

        info!("Player stopped");
    }

    /// Handle a command. Returns false if the player should stop.
    fn handle_command(&mut self, command: PlayerCommand) -> bool {
        debug!(?command, "Handling command");

        match command {
            PlayerCommand::Start { request } => {
                if let Err(e) = self.start_session(request) {
                    error!("Session start failed: {}", e);
                    self.state.send_event(PlayerEvent::Error {
                        message: e.to_string(),
                    });
                }
            }
            PlayerCommand::GetState => {
                let current = self.state.current();
                self.state.send_event(PlayerEvent::StateChanged {
                    previous: Box::new(current.clone()),
                    current: Box::new(current),
                });
            }
            PlayerCommand::GetStats => {
                let metrics = self
                    .stats
                    .as_ref()
                    .map(|stats| stats.snapshot())
                    .unwrap_or_default();
                self.state.send_event(PlayerEvent::Stats(metrics));
            }
            PlayerCommand::Shutdown => {
                self.shutdown();
                self.state.send_event(PlayerEvent::Shutdown);
                return false;
            }
        }

        true
    }

    /// Start the one playback session this player accepts.
    #[instrument(name = "start_session", skip(self, request), fields(uri = %request.data_uri))]
    pub fn start_session(&mut self, request: StartRequest) -> PlayerResult<()> {
        if self.collaborators.is_none() {
            warn!("Start request after session start, rejecting");
            return Err(PlayerError::AlreadyStarted);
        }

        let mode = PacingMode::from_speed(request.playback_speed)?;
        let kind: RendererKind = request.renderer_name.parse()?;

        let Collaborators {
            mut demuxer,
            decoders,
            renderers,
        } = self.collaborators.take().ok_or(PlayerError::AlreadyStarted)?;

        info!(?mode, renderer = %kind, "Starting session");

        let codecs = probe_supported_codecs(decoders.as_ref());
        debug!(?codecs, "Decoder support");

        let renderer = renderers.create(kind, request.canvas)?;
        let (decoder_tx, decoder_rx) = decoder_channel();
        let decoder = decoders.create(decoder_tx)?;

        let stats = Arc::new(PlaybackStats::new(mode.speed(), self.config.default_fps));
        self.stats = Some(Arc::clone(&stats));
        self.start_ticker()?;

        let status: Arc<dyn StatusSink> = Arc::new(self.reporter.clone());
        let scheduler = FrameScheduler::new(
            mode,
            renderer,
            Arc::clone(&self.clock),
            Arc::clone(&status),
            Arc::clone(&stats),
        );
        let (frame_tx, frame_rx) = crate::frame_channel();
        let scheduler_thread = thread::Builder::new()
            .name("frame-scheduler".into())
            .spawn(move || scheduler.run(frame_rx))?;

        let (demux_tx, demux_rx) = demux_channel();
        if let Err(e) = demuxer.start(&request.data_uri, demux_tx, Arc::clone(&status)) {
            drop(frame_tx);
            let _ = scheduler_thread.join();
            self.state.transition_to(PlayerState::Failed {
                message: e.to_string(),
            });
            return Err(e.into());
        }

        let session = Session {
            state: self.state.clone(),
            status,
            stats,
            default_fps: self.config.default_fps,
            demuxer,
            decoder: Some(decoder),
            frame_tx: Some(frame_tx),
            scheduler: Some(scheduler_thread),
        };
        let session_thread = thread::Builder::new()
            .name("playback-session".into())
            .spawn(move || session.run(demux_rx, decoder_rx))?;
        self.session_thread = Some(session_thread);

        info!("Session started");
        Ok(())
    }

    /// Block until the running session, if any, has finished.
    pub fn wait_for_session(&mut self) {
        if let Some(handle) = self.session_thread.take() {
            let _ = handle.join();
        }
    }

    fn start_ticker(&mut self) -> PlayerResult<()> {
        if let Some(tick_rx) = self.tick_rx.take() {
            self.ticker = Some(StatusTicker::spawn(
                self.reporter.clone(),
                tick_rx,
                self.config.status_refresh_hz,
                Arc::clone(&self.clock),
                self.state.event_sender(),
            )?);
        }
        Ok(())
    }

    fn reap_session(&mut self) {
        if self
            .session_thread
            .as_ref()
            .is_some_and(|handle| handle.is_finished())
        {
            self.wait_for_session();
            debug!("Session thread reaped");
        }
    }

    fn shutdown(&mut self) {
        if let Some(handle) = self.session_thread.take() {
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                warn!("Session still playing, detaching");
            }
        }
        if let Some(mut ticker) = self.ticker.take() {
            ticker.stop();
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        if let Some(mut ticker) = self.ticker.take() {
            ticker.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use player_demux::DemuxEvent;
    use player_ipc::{command_channel, CanvasHandle, StatusCategory};
    use player_render::RenderError;

    use crate::testing::{
        chunk_events, config_event, Call, Journal, MockDecoderFactory, MockRendererFactory,
        ScriptedDemuxer,
    };

    const CODEC: &str = "avc1.42c01e";

    struct Fixture {
        journal: Journal,
        events: Receiver<PlayerEvent>,
        player: Player,
    }

    impl Fixture {
        fn new(script: Vec<DemuxEvent>, supported: &[&str], hold_until_flush: bool) -> Self {
            let journal = Journal::default();
            let (_command_tx, command_rx) = command_channel();
            let (event_tx, events) = crossbeam_channel::unbounded();
            let collaborators = Collaborators {
                demuxer: Box::new(ScriptedDemuxer::new(script)),
                decoders: Arc::new(MockDecoderFactory {
                    journal: journal.clone(),
                    supported: supported.iter().map(|c| c.to_string()).collect(),
                    hold_until_flush,
                }),
                renderers: Arc::new(MockRendererFactory {
                    journal: journal.clone(),
                    clock: Arc::new(SystemClock),
                    draw_cost: Duration::ZERO,
                }),
            };
            let player = Player::new(command_rx, event_tx, collaborators, PlayerConfig::default());
            Self {
                journal,
                events,
                player,
            }
        }

        /// Play to the end and collect every event.
        fn finish(&mut self) -> Vec<PlayerEvent> {
            self.player.wait_for_session();
            self.player.shutdown();
            self.events.try_iter().collect()
        }

        fn decoder_calls(&self) -> Vec<Call> {
            self.journal
                .sequence()
                .into_iter()
                .filter(|call| !matches!(call, Call::Release(_)))
                .collect()
        }
    }

    fn clip(frames: u32) -> Vec<DemuxEvent> {
        let mut script = vec![config_event(CODEC, frames)];
        script.extend(chunk_events(frames));
        script.push(DemuxEvent::EndOfStream);
        script
    }

    fn request(renderer: &str, speed: f64) -> StartRequest {
        StartRequest {
            data_uri: "file:///clips/test.mp4".into(),
            renderer_name: renderer.into(),
            canvas: CanvasHandle(1),
            playback_speed: speed,
        }
    }

    fn states(events: &[PlayerEvent]) -> Vec<PlayerState> {
        events
            .iter()
            .filter_map(|event| match event {
                PlayerEvent::StateChanged { current, .. } => Some((**current).clone()),
                _ => None,
            })
            .collect()
    }

    fn decode_lines(events: &[PlayerEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|event| match event {
                PlayerEvent::Status(message) => message.get(StatusCategory::Decode),
                _ => None,
            })
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_immediate_session_plays_every_frame() {
        let mut fixture = Fixture::new(clip(5), &[CODEC], false);
        fixture.player.start_session(request("2d", 0.0)).unwrap();
        let events = fixture.finish();

        let timestamps = [0, 40_000, 80_000, 120_000, 160_000];
        assert_eq!(fixture.journal.draws(), timestamps);
        assert_eq!(fixture.journal.releases(), timestamps);

        let mut expected = vec![Call::Configure(CODEC.into())];
        expected.extend(timestamps.iter().map(|ts| Call::Decode(*ts)));
        expected.push(Call::Flush);
        assert_eq!(fixture.decoder_calls(), expected);

        assert_eq!(
            states(&events),
            [
                PlayerState::Configuring,
                PlayerState::Decoding,
                PlayerState::Draining,
                PlayerState::Idle,
            ]
        );
        assert!(fixture.player.state().is_idle());

        let stats = fixture.player.stats.as_ref().unwrap().snapshot();
        assert_eq!(stats.frames_presented, 5);
        assert_eq!(stats.total_frames, 5);
        assert_eq!(stats.configured_fps, 25.0);
    }

    #[test]
    fn test_paced_session_presents_in_order() {
        let mut fixture = Fixture::new(clip(5), &[CODEC], true);
        fixture.player.start_session(request("webgl2", 4.0)).unwrap();
        fixture.finish();

        let timestamps = [0, 40_000, 80_000, 120_000, 160_000];
        assert_eq!(fixture.journal.draws(), timestamps);
        assert_eq!(fixture.journal.releases(), timestamps);
    }

    #[test]
    fn test_empty_stream_flushes_without_frames() {
        let mut fixture = Fixture::new(vec![DemuxEvent::EndOfStream], &[CODEC], false);
        fixture.player.start_session(request("2d", 1.0)).unwrap();
        let events = fixture.finish();

        assert_eq!(fixture.journal.calls(), [Call::Flush]);
        assert!(!events
            .iter()
            .any(|event| matches!(event, PlayerEvent::Error { .. })));
        assert_eq!(states(&events), [PlayerState::Draining, PlayerState::Idle]);
    }

    #[test]
    fn test_second_start_rejected() {
        let mut fixture = Fixture::new(clip(2), &[CODEC], false);
        fixture.player.start_session(request("2d", 0.0)).unwrap();

        let result = fixture.player.start_session(request("2d", 0.0));
        assert!(matches!(result, Err(PlayerError::AlreadyStarted)));

        fixture.finish();
        assert_eq!(fixture.journal.draws().len(), 2);
    }

    #[test]
    fn test_unknown_renderer_rejected() {
        let mut fixture = Fixture::new(clip(2), &[CODEC], false);
        let result = fixture.player.start_session(request("canvas3d", 1.0));

        assert!(matches!(
            result,
            Err(PlayerError::Render(RenderError::UnknownRenderer(ref name))) if name == "canvas3d"
        ));
        assert!(fixture.player.session_thread.is_none());
        assert!(fixture.player.state().is_idle());
    }

    #[test]
    fn test_negative_speed_rejected() {
        let mut fixture = Fixture::new(clip(2), &[CODEC], false);
        let result = fixture.player.start_session(request("2d", -1.0));

        assert!(matches!(result, Err(PlayerError::InvalidPlaybackSpeed(_))));
        assert!(fixture.journal.calls().is_empty());
    }

    #[test]
    fn test_decoder_errors_become_status() {
        let mut fixture = Fixture::new(clip(2), &[], false);
        fixture.player.start_session(request("2d", 0.0)).unwrap();
        let events = fixture.finish();

        let lines = decode_lines(&events);
        assert!(lines.last().unwrap().starts_with("Error: "), "{lines:?}");
        assert!(fixture.journal.draws().is_empty());
        assert!(fixture.player.state().is_idle());
    }

    #[test]
    fn test_demux_failure_aborts_session() {
        let message = "avcC, hvcC, or vpcC box not found".to_string();
        let mut fixture = Fixture::new(
            vec![DemuxEvent::Failed {
                message: message.clone(),
            }],
            &[CODEC],
            false,
        );
        fixture.player.start_session(request("2d", 1.0)).unwrap();
        let events = fixture.finish();

        assert_eq!(states(&events), [PlayerState::Failed { message }]);
        assert!(fixture.journal.calls().is_empty());
    }

    #[test]
    fn test_command_loop() {
        let journal = Journal::default();
        let (command_tx, command_rx) = command_channel();
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let collaborators = Collaborators {
            demuxer: Box::new(ScriptedDemuxer::new(vec![DemuxEvent::EndOfStream])),
            decoders: Arc::new(MockDecoderFactory {
                journal: journal.clone(),
                supported: vec![CODEC.into()],
                hold_until_flush: false,
            }),
            renderers: Arc::new(MockRendererFactory {
                journal,
                clock: Arc::new(SystemClock),
                draw_cost: Duration::ZERO,
            }),
        };

        let handle = thread::spawn(move || {
            let mut player = crate::create_player(command_rx, event_tx, collaborators);
            player.run();
        });

        for command in [
            PlayerCommand::Start {
                request: request("2d", 1.0),
            },
            PlayerCommand::Start {
                request: request("2d", 1.0),
            },
            PlayerCommand::GetStats,
        ] {
            command_tx.send(command).unwrap();
        }

        // Let the session finish before shutting down.
        let mut events = Vec::new();
        loop {
            let event = event_rx.recv_timeout(Duration::from_secs(5)).unwrap();
            let done = matches!(
                &event,
                PlayerEvent::StateChanged { current, .. } if current.is_idle()
            );
            events.push(event);
            if done {
                break;
            }
        }

        command_tx.send(PlayerCommand::Shutdown).unwrap();
        handle.join().unwrap();
        events.extend(event_rx.try_iter());
        assert!(matches!(events.first(), Some(PlayerEvent::Ready)));
        assert!(matches!(events.last(), Some(PlayerEvent::Shutdown)));
        assert!(events.iter().any(|event| matches!(
            event,
            PlayerEvent::Error { message } if message == "Session already started"
        )));
        assert!(events
            .iter()
            .any(|event| matches!(event, PlayerEvent::Stats(_))));
    }
}
