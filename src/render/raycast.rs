//! Per-column ray marching against the tile grid

use crate::game::Pose;
use crate::world::{GridWorld, Tile};

/// Camera and marching parameters
#[derive(Debug, Clone, Copy)]
pub struct RayConfig {
    /// Horizontal field of view in radians
    pub fov: f32,
    /// Farthest distance sampled, world units
    pub max_depth: f32,
    /// March increment; walls thinner than this can be skipped
    pub step_size: f32,
    /// Angle under which a ray counts as grazing a wall corner
    pub boundary_tolerance: f32,
    pub screen_width: usize,
}

impl RayConfig {
    pub fn with_width(screen_width: usize) -> Self {
        Self {
            screen_width,
            ..Self::default()
        }
    }

    /// Ray angle for screen column `x`
    pub fn column_angle(&self, heading: f32, x: usize) -> f32 {
        heading - self.fov / 2.0 + (x as f32 / self.screen_width as f32) * self.fov
    }
}

impl Default for RayConfig {
    fn default() -> Self {
        Self {
            fov: std::f32::consts::FRAC_PI_4,
            max_depth: 16.0,
            step_size: 0.1,
            boundary_tolerance: 0.01,
            screen_width: 120,
        }
    }
}

/// Result of one column's ray
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnHit {
    pub distance: f32,
    /// Ray grazes a wall edge; drawn blank to separate faces
    pub boundary: bool,
}

/// Wall shading bands, densest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Shade {
    Solid,
    Dense,
    Medium,
    Light,
    Blank,
}

impl Shade {
    /// Quantize distance against the view depth
    pub fn for_distance(distance: f32, max_depth: f32) -> Self {
        if distance <= max_depth / 4.0 {
            Shade::Solid
        } else if distance < max_depth / 3.0 {
            Shade::Dense
        } else if distance < max_depth / 2.0 {
            Shade::Medium
        } else if distance < max_depth {
            Shade::Light
        } else {
            Shade::Blank
        }
    }

    pub fn glyph(self) -> char {
        match self {
            Shade::Solid => '\u{2588}',
            Shade::Dense => '\u{2593}',
            Shade::Medium => '\u{2592}',
            Shade::Light => '\u{2591}',
            Shade::Blank => ' ',
        }
    }
}

impl ColumnHit {
    pub fn shade(&self, max_depth: f32) -> Shade {
        if self.boundary {
            Shade::Blank
        } else {
            Shade::for_distance(self.distance, max_depth)
        }
    }
}

/// Nearest distance per screen column. Sprite drawing latches nearer
/// values into it during the frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthBuffer {
    depths: Vec<f32>,
}

impl DepthBuffer {
    pub fn from_hits(hits: &[ColumnHit]) -> Self {
        Self {
            depths: hits.iter().map(|h| h.distance).collect(),
        }
    }

    pub fn get(&self, column: usize) -> Option<f32> {
        self.depths.get(column).copied()
    }

    /// Whether something at `distance` is visible in `column`
    pub fn is_visible(&self, column: usize, distance: f32) -> bool {
        self.get(column).is_some_and(|depth| depth >= distance)
    }

    pub fn latch(&mut self, column: usize, distance: f32) {
        if let Some(depth) = self.depths.get_mut(column) {
            *depth = distance;
        }
    }
}

/// Cast every column for a pose
pub fn cast_view(world: &GridWorld, pose: &Pose, config: &RayConfig) -> Vec<ColumnHit> {
    (0..config.screen_width)
        .map(|x| cast_ray(world, pose.x, pose.y, config.column_angle(pose.heading, x), config))
        .collect()
}

/// March a single ray from `(origin_x, origin_y)` along `angle`
pub fn cast_ray(world: &GridWorld, origin_x: f32, origin_y: f32, angle: f32, config: &RayConfig) -> ColumnHit {
    let eye_x = angle.sin();
    let eye_y = angle.cos();
    let mut distance = 0.0_f32;

    while distance < config.max_depth {
        distance += config.step_size;
        let test_x = (origin_x + eye_x * distance) as i32;
        let test_y = (origin_y + eye_y * distance) as i32;

        match world.tile(test_x, test_y) {
            None => {
                return ColumnHit {
                    distance: config.max_depth,
                    boundary: false,
                }
            }
            Some(Tile::Wall) => {
                let boundary = grazes_corner(
                    origin_x,
                    origin_y,
                    eye_x,
                    eye_y,
                    test_x,
                    test_y,
                    config.boundary_tolerance,
                );
                return ColumnHit {
                    distance: distance.max(config.step_size),
                    boundary,
                };
            }
            Some(Tile::Empty) => {}
        }
    }

    ColumnHit {
        distance: config.max_depth,
        boundary: false,
    }
}

/// Check the three nearest lattice corners of the hit cell for a near-parallel ray
fn grazes_corner(
    origin_x: f32,
    origin_y: f32,
    eye_x: f32,
    eye_y: f32,
    cell_x: i32,
    cell_y: i32,
    tolerance: f32,
) -> bool {
    let mut corners: Vec<(f32, f32)> = Vec::with_capacity(4);
    for tx in 0..2 {
        for ty in 0..2 {
            let vx = (cell_x + tx) as f32 - origin_x;
            let vy = (cell_y + ty) as f32 - origin_y;
            let d = (vx * vx + vy * vy).sqrt();
            if d <= f32::EPSILON {
                continue;
            }
            let dot = (eye_x * vx / d + eye_y * vy / d).clamp(-1.0, 1.0);
            corners.push((d, dot));
        }
    }

    corners.sort_by(|a, b| a.0.total_cmp(&b.0));
    corners
        .iter()
        .take(3)
        .any(|&(_, dot)| dot.acos() < tolerance)
}
