//! Process-wide state built once at startup

use std::sync::Arc;

use rand::rngs::OsRng;
use rand::Rng;

use crate::config::Config;
use crate::game::combat::WeaponStats;
use crate::game::SimSettings;
use crate::net::protocol::{generate_key, topic_hash};
use crate::world::GridWorld;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub world: Arc<GridWorld>,
    /// Local public key hex, doubles as the player id
    pub local_id: String,
    /// Rendezvous topic hash
    pub topic: String,
    /// Seed for the simulation's jitter
    pub seed: u64,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        let mut rng = OsRng;

        let local_id = generate_key(&mut rng);
        let topic = topic_hash(&config.topic_name);
        let seed = config.rng_seed.unwrap_or_else(|| rng.gen());

        Self {
            config,
            world: Arc::new(GridWorld::arena()),
            local_id,
            topic,
            seed,
        }
    }

    /// Simulation tuning derived from the config
    pub fn sim_settings(&self) -> SimSettings {
        SimSettings {
            weapon: WeaponStats::with_damage(self.config.damage_per_hit),
            respawn: self.config.respawn,
            start_in_lobby: self.config.lobby,
            ..SimSettings::default()
        }
    }
}
