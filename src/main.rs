//! ASCII Arena - terminal raycasting shooter
//!
//! Each instance renders its own view of the arena into the terminal and
//! floods its player state to every peer on the same topic. There is no
//! server: peers trust whatever state they receive.

mod app;
mod config;
mod game;
mod net;
mod render;
mod util;
mod world;

use std::fs::File;
use std::sync::Mutex;

use crossterm::event::EventStream;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::{AppState, FrameLoop};
use crate::config::Config;
use crate::net::{Mesh, MeshConfig};
use crate::render::surface::restore_terminal;
use crate::render::TerminalSurface;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(&config.log_level, &config.log_file)?;

    let state = AppState::new(config.clone());
    info!(
        player = %state.local_id,
        topic = %state.topic,
        map_width = state.world.width(),
        map_height = state.world.height(),
        "Starting ASCII Arena"
    );

    let (mesh, mesh_events) = Mesh::join(
        MeshConfig::from(&config),
        state.topic.clone(),
        state.local_id.clone(),
    )
    .await?;
    info!(addr = %mesh.local_addr(), peers = config.mesh_peers.len(), "Joined mesh");

    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = restore_terminal();
        default_hook(panic);
    }));

    let surface = TerminalSurface::enter()?;
    FrameLoop::new(state, surface)
        .run(EventStream::new(), mesh_events)
        .await?;

    info!("Shutting down");
    std::process::exit(1);
}

/// Initialize tracing into the log file; the terminal is taken by the frame
fn init_tracing(log_level: &str, log_file: &str) -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));
    let file = File::create(log_file)?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
    Ok(())
}
