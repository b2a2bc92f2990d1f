//! Game simulation modules

pub mod combat;
pub mod input;
pub mod physics;
pub mod player;
pub mod respawn;
pub mod snapshot;
pub mod state;

pub use input::Command;
pub use player::Pose;
pub use snapshot::SnapshotBuilder;
pub use state::{GameState, Phase, SimSettings};
