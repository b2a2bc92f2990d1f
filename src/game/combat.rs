//! Combat system - projectiles, damage, hit detection

use crate::net::protocol::PeerState;
use crate::world::GridWorld;

use super::player::Pose;

/// Weapon tuning
#[derive(Debug, Clone, Copy)]
pub struct WeaponStats {
    /// Damage per hit
    pub damage: i32,
    /// Projectile speed in world units per second
    pub projectile_speed: f32,
    /// Maximum angular jitter either side of the aim, in radians
    pub jitter: f32,
    /// Distance below which a projectile strikes a player
    pub hit_radius: f32,
}

impl WeaponStats {
    pub fn with_damage(damage: i32) -> Self {
        Self {
            damage,
            ..Self::default()
        }
    }
}

impl Default for WeaponStats {
    fn default() -> Self {
        Self {
            damage: 10,
            projectile_speed: 8.0,
            jitter: 0.05,
            hit_radius: 0.5,
        }
    }
}

/// A projectile fired by the local player
#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    /// Set during a frame, filtered out at the end of it
    pub remove: bool,
    /// Struck a peer. Frozen at the hit point and carried in one more
    /// snapshot so the target registers the hit, then retired.
    pub spent: bool,
}

impl Projectile {
    /// Spawn at the shooter's position, aimed along heading + `noise`
    pub fn fire(pose: &Pose, noise: f32, stats: &WeaponStats) -> Self {
        let angle = pose.heading + noise;
        Self {
            x: pose.x,
            y: pose.y,
            vx: angle.sin() * stats.projectile_speed,
            vy: angle.cos() * stats.projectile_speed,
            remove: false,
            spent: false,
        }
    }

    pub fn update(&mut self, dt: f32) {
        self.x += self.vx * dt;
        self.y += self.vy * dt;
    }

    /// Still moving and able to hit
    pub fn in_flight(&self) -> bool {
        !self.remove && !self.spent
    }

    #[cfg(test)]
    pub fn speed(&self) -> f32 {
        (self.vx * self.vx + self.vy * self.vy).sqrt()
    }

    /// Check collision with a target position
    pub fn check_hit(&self, target_x: f32, target_y: f32, radius: f32) -> bool {
        let dx = self.x - target_x;
        let dy = self.y - target_y;
        (dx * dx + dy * dy).sqrt() < radius
    }
}

/// Combat system for moving projectiles and applying damage
pub struct CombatSystem;

impl CombatSystem {
    /// Apply damage to health. Not clamped at zero, saturates at `i32::MIN`.
    pub fn apply_damage(current_health: i32, damage: i32) -> i32 {
        current_health.saturating_sub(damage)
    }

    /// Integrate local projectiles. Wall hits are flagged for removal, peer
    /// hits are marked spent and lower the peer's stored health.
    /// Returns the number of peer hits.
    pub fn advance_projectiles(
        projectiles: &mut [Projectile],
        dt: f32,
        world: &GridWorld,
        peers: &mut [&mut PeerState],
        stats: &WeaponStats,
    ) -> u32 {
        let mut hits = 0;

        for projectile in projectiles.iter_mut().filter(|p| p.in_flight()) {
            projectile.update(dt);

            for peer in peers.iter_mut() {
                if projectile.check_hit(peer.x, peer.y, stats.hit_radius) {
                    peer.health = Self::apply_damage(peer.health, stats.damage);
                    projectile.spent = true;
                    hits += 1;
                    break;
                }
            }

            if !projectile.spent && world.is_wall_at(projectile.x, projectile.y) {
                projectile.remove = true;
            }
        }

        hits
    }

    /// Count remote projectiles that reach the local player. Each one that
    /// hits is dropped from its record so the same snapshot cannot hit twice.
    pub fn incoming_hits(pose: &Pose, peers: &mut [&mut PeerState], stats: &WeaponStats) -> u32 {
        let mut hits = 0;

        for peer in peers.iter_mut() {
            peer.bullets.retain(|bullet| {
                if pose.distance_to(bullet.x, bullet.y) < stats.hit_radius {
                    hits += 1;
                    false
                } else {
                    true
                }
            });
        }

        hits
    }
}
