//! Game state and the per-frame simulation step

use std::sync::Arc;
use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::config::RespawnMode;
use crate::net::protocol::PeerState;
use crate::world::GridWorld;

use super::combat::{CombatSystem, Projectile, WeaponStats};
use super::input::Command;
use super::physics::{MovementStats, PhysicsSystem};
use super::player::{PlayerState, Pose, SPAWN_POSE};
use super::respawn::RespawnScheduler;

/// Top-level game phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Roster view, no physics, waiting for the local ready key
    Lobby,
    /// Arena running
    Game,
}

/// Simulation tuning
#[derive(Debug, Clone, Copy)]
pub struct SimSettings {
    pub movement: MovementStats,
    pub weapon: WeaponStats,
    pub respawn: RespawnMode,
    pub spawn: Pose,
    pub start_in_lobby: bool,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            movement: MovementStats::default(),
            weapon: WeaponStats::default(),
            respawn: RespawnMode::Immediate,
            spawn: SPAWN_POSE,
            start_in_lobby: true,
        }
    }
}

/// What happened during one simulated frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub commands: usize,
    pub hits_dealt: u32,
    pub hits_taken: u32,
    pub died: bool,
    pub respawned: bool,
}

/// Everything the local simulation owns
pub struct GameState {
    pub phase: Phase,
    pub player: PlayerState,
    pub projectiles: Vec<Projectile>,
    pub respawns: u32,
    world: Arc<GridWorld>,
    settings: SimSettings,
    commands: Vec<Command>,
    respawn: RespawnScheduler,
    rng: ChaCha8Rng,
}

impl GameState {
    pub fn new(world: Arc<GridWorld>, local_id: String, settings: SimSettings, seed: u64) -> Self {
        let phase = if settings.start_in_lobby {
            Phase::Lobby
        } else {
            Phase::Game
        };

        Self {
            phase,
            player: PlayerState::new(local_id, settings.spawn),
            projectiles: Vec::new(),
            respawns: 0,
            world,
            settings,
            commands: Vec::new(),
            respawn: RespawnScheduler::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn world(&self) -> &GridWorld {
        &self.world
    }

    /// Queue a command for the next frame
    pub fn queue(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Run one frame: drain input, integrate projectiles, resolve hits,
    /// then run the single death check for the frame.
    pub fn simulate(&mut self, dt: f32, now: Instant, peers: &mut [&mut PeerState]) -> FrameReport {
        let mut report = FrameReport::default();

        let commands = std::mem::take(&mut self.commands);
        report.commands = commands.len();
        for command in commands {
            self.apply(command, dt);
        }

        if self.phase == Phase::Lobby {
            return report;
        }

        let weapon = self.settings.weapon;
        report.hits_dealt = CombatSystem::advance_projectiles(
            &mut self.projectiles,
            dt,
            &self.world,
            peers,
            &weapon,
        );
        self.projectiles.retain(|p| !p.remove);

        report.hits_taken = self.take_hits(peers);

        self.check_death(now, &mut report);
        report
    }

    /// Resolve a peer's bullets against the local player as soon as its
    /// state arrives, so no snapshot is overwritten unseen. Hit bullets are
    /// dropped from the record; death is checked on the next frame.
    pub fn absorb_hits(&mut self, peer: &mut PeerState) -> u32 {
        if self.phase == Phase::Lobby {
            return 0;
        }
        self.take_hits(&mut [peer])
    }

    /// Drop projectiles that struck a peer once a snapshot has carried them
    pub fn retire_spent(&mut self) {
        self.projectiles.retain(|p| !p.spent);
    }

    fn take_hits(&mut self, peers: &mut [&mut PeerState]) -> u32 {
        let weapon = self.settings.weapon;
        let hits = CombatSystem::incoming_hits(&self.player.pose, peers, &weapon);
        for _ in 0..hits {
            self.player.health = CombatSystem::apply_damage(self.player.health, weapon.damage);
        }
        hits
    }

    fn apply(&mut self, command: Command, dt: f32) {
        if self.phase == Phase::Lobby {
            if command == Command::Ready {
                self.player.ready = true;
                self.phase = Phase::Game;
                info!(player = %self.player.local_id, "Player ready, entering arena");
            }
            return;
        }

        if !self.player.alive {
            return;
        }

        let movement = self.settings.movement;
        match command {
            Command::TurnLeft => PhysicsSystem::turn(&mut self.player.pose, -1.0, dt, &movement),
            Command::TurnRight => PhysicsSystem::turn(&mut self.player.pose, 1.0, dt, &movement),
            Command::Forward => {
                PhysicsSystem::advance(&mut self.player.pose, 1.0, dt, &movement, &self.world);
            }
            Command::Back => {
                PhysicsSystem::advance(&mut self.player.pose, -1.0, dt, &movement, &self.world);
            }
            Command::Fire => self.fire(),
            Command::Ready | Command::Quit => {}
        }
    }

    fn fire(&mut self) {
        let weapon = self.settings.weapon;
        let noise = if weapon.jitter > 0.0 {
            self.rng.gen_range(-weapon.jitter..weapon.jitter)
        } else {
            0.0
        };
        let projectile = Projectile::fire(&self.player.pose, noise, &weapon);
        debug!(
            x = projectile.x,
            y = projectile.y,
            vx = projectile.vx,
            vy = projectile.vy,
            "Projectile fired"
        );
        self.projectiles.push(projectile);
    }

    fn check_death(&mut self, now: Instant, report: &mut FrameReport) {
        if self.player.alive && self.player.health <= 0 {
            self.player.alive = false;
            report.died = true;
            info!(health = self.player.health, "Player died");

            match self.settings.respawn {
                RespawnMode::Immediate => self.respawn_now(report),
                RespawnMode::Delayed(delay) => {
                    let scheduled = self.respawn.schedule(now, delay);
                    debug!(generation = scheduled.generation, "Respawn scheduled");
                }
            }
            return;
        }

        if !self.player.alive && self.respawn.poll(now).is_some() {
            self.respawn_now(report);
        }
    }

    fn respawn_now(&mut self, report: &mut FrameReport) {
        self.player.respawn(self.settings.spawn);
        self.respawns += 1;
        report.respawned = true;
        info!(respawns = self.respawns, "Player respawned");
    }
}
