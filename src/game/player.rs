//! Local player pose and health

/// Full health on spawn and respawn
pub const MAX_HEALTH: i32 = 100;

/// Position in world units and heading in radians.
/// Forward is `(sin heading, cos heading)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub x: f32,
    pub y: f32,
    pub heading: f32,
}

impl Pose {
    pub const fn new(x: f32, y: f32, heading: f32) -> Self {
        Self { x, y, heading }
    }

    pub fn forward(&self) -> (f32, f32) {
        (self.heading.sin(), self.heading.cos())
    }

    pub fn distance_to(&self, x: f32, y: f32) -> f32 {
        let dx = x - self.x;
        let dy = y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Where the local player appears at start and after every death
pub const SPAWN_POSE: Pose = Pose::new(8.0, 8.0, 0.0);

/// The local player (owned by the simulation)
#[derive(Debug, Clone)]
pub struct PlayerState {
    pub local_id: String,
    pub pose: Pose,
    /// Mutated without clamping; can dip below zero before the death check
    pub health: i32,
    pub ready: bool,
    pub alive: bool,
}

impl PlayerState {
    pub fn new(local_id: String, spawn: Pose) -> Self {
        Self {
            local_id,
            pose: spawn,
            health: MAX_HEALTH,
            ready: false,
            alive: true,
        }
    }

    /// Reset pose and health in place
    pub fn respawn(&mut self, spawn: Pose) {
        self.pose = spawn;
        self.health = MAX_HEALTH;
        self.alive = true;
    }
}
