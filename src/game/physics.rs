//! Player movement and wall collision

use crate::world::GridWorld;

use super::player::Pose;

/// Movement tuning
#[derive(Debug, Clone, Copy)]
pub struct MovementStats {
    /// World units per second
    pub speed: f32,
    /// Turn rate as a fraction of `speed`, in radians per second
    pub turn_factor: f32,
}

impl Default for MovementStats {
    fn default() -> Self {
        Self {
            speed: 5.0,
            turn_factor: 0.75,
        }
    }
}

/// Physics system for updating the local pose
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Rotate by `direction` (-1 left, +1 right) scaled by elapsed time
    pub fn turn(pose: &mut Pose, direction: f32, dt: f32, stats: &MovementStats) {
        pose.heading += direction * stats.speed * stats.turn_factor * dt;
    }

    /// Move along the heading (`direction` +1 forward, -1 back).
    /// A move ending inside a wall is reverted; returns whether the pose changed.
    pub fn advance(
        pose: &mut Pose,
        direction: f32,
        dt: f32,
        stats: &MovementStats,
        world: &GridWorld,
    ) -> bool {
        let (fx, fy) = pose.forward();
        let step = direction * stats.speed * dt;
        let new_x = pose.x + fx * step;
        let new_y = pose.y + fy * step;

        if world.is_wall_at(new_x, new_y) {
            return false;
        }

        pose.x = new_x;
        pose.y = new_y;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_move_scales_with_elapsed_time() {
        let world = GridWorld::arena();
        let mut pose = Pose::new(8.0, 8.0, 0.0);
        let stats = MovementStats::default();

        assert!(PhysicsSystem::advance(&mut pose, 1.0, 0.1, &stats, &world));
        assert!((pose.y - 8.5).abs() < 1e-4);
        assert!((pose.x - 8.0).abs() < 1e-4);

        assert!(PhysicsSystem::advance(&mut pose, -1.0, 0.1, &stats, &world));
        assert!((pose.y - 8.0).abs() < 1e-4);
    }

    #[test]
    fn move_into_wall_is_reverted() {
        let world = GridWorld::arena();
        // Facing +x with the border wall at x = 15
        let mut pose = Pose::new(14.8, 1.5, std::f32::consts::FRAC_PI_2);
        let before = pose;

        assert!(!PhysicsSystem::advance(
            &mut pose,
            1.0,
            0.1,
            &MovementStats::default(),
            &world
        ));
        assert_eq!(pose, before);
    }

    #[test]
    fn turning_uses_reduced_rate() {
        let mut pose = Pose::new(8.0, 8.0, 0.0);
        PhysicsSystem::turn(&mut pose, 1.0, 0.2, &MovementStats::default());
        assert!((pose.heading - 0.75).abs() < 1e-5);
        PhysicsSystem::turn(&mut pose, -1.0, 0.2, &MovementStats::default());
        assert!(pose.heading.abs() < 1e-5);
    }
}
