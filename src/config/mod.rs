//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// When the local state is flooded to connected peers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastPolicy {
    /// After every simulated frame
    PerFrame,
    /// After every handled key press
    PerInput,
}

/// How the local player comes back after dying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RespawnMode {
    Immediate,
    Delayed(Duration),
}

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// File receiving log output (stdout belongs to the frame)
    pub log_file: String,

    /// Address the mesh listens on for inbound peers
    pub mesh_listen: SocketAddr,
    /// Bootstrap peers dialed at startup
    pub mesh_peers: Vec<SocketAddr>,
    /// Application identifier hashed into the rendezvous topic
    pub topic_name: String,

    pub screen_width: usize,
    pub screen_height: usize,
    /// Target frames per second for the frame loop
    pub frame_rate: u32,

    /// Health removed by a single projectile hit
    pub damage_per_hit: i32,
    pub respawn: RespawnMode,
    pub broadcast: BroadcastPolicy,
    /// Start in the ready-up lobby instead of straight in the arena
    pub lobby: bool,
    /// Seed for fire jitter; random when unset
    pub rng_seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: "ascii_arena.log".to_string(),
            mesh_listen: SocketAddr::from(([0, 0, 0, 0], 7878)),
            mesh_peers: Vec::new(),
            topic_name: "command-line-fps".to_string(),
            screen_width: 120,
            screen_height: 40,
            frame_rate: 60,
            damage_per_hit: 10,
            respawn: RespawnMode::Immediate,
            broadcast: BroadcastPolicy::PerFrame,
            lobby: true,
            rng_seed: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let mesh_listen = match lookup("MESH_LISTEN") {
            Some(addr) => addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress(addr.clone()))?,
            None => defaults.mesh_listen,
        };

        let mesh_peers = match lookup("MESH_PEERS") {
            Some(list) => parse_peer_list(&list)?,
            None => Vec::new(),
        };

        let screen_width = parse_or("SCREEN_WIDTH", &lookup, defaults.screen_width)?;
        let screen_height = parse_or("SCREEN_HEIGHT", &lookup, defaults.screen_height)?;
        if screen_width == 0 || screen_height < 2 {
            return Err(ConfigError::Invalid("SCREEN_WIDTH/SCREEN_HEIGHT"));
        }

        let frame_rate: u32 = parse_or("FRAME_RATE", &lookup, defaults.frame_rate)?;
        if frame_rate == 0 {
            return Err(ConfigError::Invalid("FRAME_RATE"));
        }

        let respawn_delay_ms: u64 = parse_or("RESPAWN_DELAY_MS", &lookup, 0)?;
        let respawn = if respawn_delay_ms == 0 {
            RespawnMode::Immediate
        } else {
            RespawnMode::Delayed(Duration::from_millis(respawn_delay_ms))
        };

        let broadcast = match lookup("BROADCAST_POLICY").as_deref() {
            None | Some("frame") => BroadcastPolicy::PerFrame,
            Some("input") => BroadcastPolicy::PerInput,
            Some(_) => return Err(ConfigError::Invalid("BROADCAST_POLICY")),
        };

        let rng_seed = match lookup("RNG_SEED") {
            Some(raw) => Some(raw.parse().map_err(|_| ConfigError::Invalid("RNG_SEED"))?),
            None => None,
        };

        Ok(Self {
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_file: lookup("LOG_FILE").unwrap_or(defaults.log_file),
            mesh_listen,
            mesh_peers,
            topic_name: lookup("TOPIC_NAME").unwrap_or(defaults.topic_name),
            screen_width,
            screen_height,
            frame_rate,
            damage_per_hit: parse_or("DAMAGE_PER_HIT", &lookup, defaults.damage_per_hit)?,
            respawn,
            broadcast,
            lobby: parse_or("LOBBY", &lookup, defaults.lobby)?,
            rng_seed,
        })
    }
}

fn parse_or<T, F>(key: &'static str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

fn parse_peer_list(list: &str) -> Result<Vec<SocketAddr>, ConfigError> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse()
                .map_err(|_| ConfigError::InvalidAddress(s.to_string()))
        })
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid socket address: {0}")]
    InvalidAddress(String),
}
