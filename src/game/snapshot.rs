//! Snapshot building and broadcast gating

use crate::config::BroadcastPolicy;
use crate::net::protocol::{WireBullet, WireState};

use super::combat::Projectile;
use super::player::PlayerState;

/// Builds the full local state for flooding to peers
pub struct SnapshotBuilder {
    policy: BroadcastPolicy,
    /// Input arrived since the last snapshot went out
    input_pending: bool,
}

impl SnapshotBuilder {
    pub fn new(policy: BroadcastPolicy) -> Self {
        Self {
            policy,
            input_pending: false,
        }
    }

    /// Record that a key event was handled
    pub fn note_input(&mut self) {
        self.input_pending = true;
    }

    /// Check if this frame should broadcast. Clears the pending input flag.
    pub fn should_send(&mut self) -> bool {
        let pending = std::mem::take(&mut self.input_pending);
        match self.policy {
            BroadcastPolicy::PerFrame => true,
            BroadcastPolicy::PerInput => pending,
        }
    }

    /// Build a snapshot message. Projectiles flagged for removal are skipped,
    /// spent ones are still carried.
    pub fn build(player: &PlayerState, projectiles: &[Projectile]) -> WireState {
        WireState {
            id: player.local_id.clone(),
            x: player.pose.x,
            y: player.pose.y,
            a: player.pose.heading,
            health: player.health,
            bullets: projectiles
                .iter()
                .filter(|p| !p.remove)
                .map(|p| WireBullet {
                    x: p.x,
                    y: p.y,
                    vx: p.vx,
                    vy: p.vy,
                })
                .collect(),
            ready: player.ready,
        }
    }
}
