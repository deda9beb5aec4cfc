//! Command-line host for the player.
//!
//! `inspect` demuxes a file and prints what a decoder would be given.
//! `play` runs a full session with a pass-through decoder and a renderer
//! that only logs, which shows the pacing and status output.

mod inspect;
mod passthrough;

use std::thread;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use player_demux::Mp4Demuxer;
use player_engine::{Collaborators, Player};
use player_ipc::{
    CanvasHandle, PlayerCommand, PlayerConfig, PlayerEvent, PlayerState, StartRequest,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Read size used while fetching
    #[arg(long, default_value_t = 64 * 1024)]
    chunk_size: usize,
}

#[derive(Subcommand)]
enum Command {
    /// Print the decoder configuration and chunk summary
    Inspect {
        /// Path, file:// or http(s):// URL
        uri: String,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Play through the engine without decoding pixels
    Play {
        /// Path, file:// or http(s):// URL
        uri: String,

        /// Playback-rate multiplier, 0 to present as fast as possible
        #[arg(long, default_value_t = 1.0)]
        speed: f64,

        /// Renderer name: 2d, webgl, webgl2 or webgpu
        #[arg(long, default_value = "2d")]
        renderer: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    match args.command {
        Command::Inspect { uri, json } => {
            let summary = inspect::inspect(&uri, args.chunk_size)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{summary}");
            }
            Ok(())
        }
        Command::Play {
            uri,
            speed,
            renderer,
        } => play(uri, speed, renderer, args.chunk_size),
    }
}

fn play(uri: String, speed: f64, renderer: String, chunk_size: usize) -> anyhow::Result<()> {
    let config = PlayerConfig {
        fetch_chunk_size: chunk_size,
        ..PlayerConfig::default()
    };

    let (command_tx, command_rx) = player_ipc::command_channel();
    let (event_tx, event_rx) = player_ipc::event_channel();

    let collaborators = Collaborators {
        demuxer: Box::new(Mp4Demuxer::new(config.fetch_chunk_size)),
        decoders: passthrough::decoder_factory(),
        renderers: passthrough::renderer_factory(),
    };

    let player_thread = thread::spawn(move || {
        info!("Player thread starting");
        let mut player = Player::new(command_rx, event_tx, collaborators, config);
        player.run();
        info!("Player thread stopped");
    });

    command_tx
        .send(PlayerCommand::Start {
            request: StartRequest {
                data_uri: uri,
                renderer_name: renderer,
                canvas: CanvasHandle(0),
                playback_speed: speed,
            },
        })
        .context("Player thread is gone")?;

    let outcome = watch_session(&event_rx, &command_tx);

    let _ = command_tx.send(PlayerCommand::Shutdown);
    let _ = player_thread.join();
    outcome
}

fn watch_session(
    event_rx: &crossbeam_channel::Receiver<PlayerEvent>,
    command_tx: &crossbeam_channel::Sender<PlayerCommand>,
) -> anyhow::Result<()> {
    let mut started = false;

    loop {
        let event = event_rx
            .recv_timeout(Duration::from_secs(30))
            .context("No progress from player")?;

        match event {
            PlayerEvent::Status(message) => {
                for (category, line) in message.iter() {
                    info!("[{category}] {line}");
                }
            }
            PlayerEvent::StateChanged { current, .. } => {
                debug!(state = current.name(), "State changed");
                if let PlayerState::Failed { message } = current.as_ref() {
                    bail!("Playback failed: {message}");
                }
                if current.is_active() {
                    started = true;
                } else if started && current.is_idle() {
                    command_tx.send(PlayerCommand::GetStats)?;
                }
            }
            PlayerEvent::Stats(metrics) => {
                println!("{}", serde_json::to_string_pretty(&metrics)?);
                return Ok(());
            }
            PlayerEvent::Error { message } => bail!("{message}"),
            PlayerEvent::Ready | PlayerEvent::Shutdown => {}
        }
    }
}
