//! Scene composition: walls, floor, billboards, overlays

use std::f32::consts::PI;

use crate::game::Pose;
use crate::world::GridWorld;

use super::frame::{Cell, Frame};
use super::raycast::{cast_view, ColumnHit, DepthBuffer, RayConfig};
use super::sprites::Sprite;

/// Values printed on the status row
#[derive(Debug, Clone, Copy)]
pub struct Hud {
    pub x: f32,
    pub y: f32,
    pub heading: f32,
    pub health: i32,
    pub fps: f32,
}

/// Everything one arena frame shows
pub struct SceneView<'a> {
    pub world: &'a GridWorld,
    pub pose: Pose,
    /// Remote player positions
    pub peers: &'a [(f32, f32)],
    /// Local projectiles still in flight
    pub projectiles: &'a [(f32, f32)],
    /// Projectiles carried in peers' last states
    pub remote_projectiles: &'a [(f32, f32)],
    pub hud: Hud,
}

/// One line of the lobby roster
#[derive(Debug, Clone)]
pub struct RosterEntry {
    pub id: String,
    /// `None` until the peer's first state arrives
    pub health: Option<i32>,
    pub ready: bool,
    pub is_local: bool,
}

pub struct Compositor {
    ray: RayConfig,
    screen_height: usize,
    enemy: Sprite,
    projectile: Sprite,
}

impl Compositor {
    pub fn new(ray: RayConfig, screen_height: usize) -> Self {
        Self {
            ray,
            screen_height,
            enemy: Sprite::enemy(),
            projectile: Sprite::projectile(),
        }
    }

    pub fn width(&self) -> usize {
        self.ray.screen_width
    }

    pub fn height(&self) -> usize {
        self.screen_height
    }

    pub fn compose(&self, view: &SceneView<'_>) -> Frame {
        let mut frame = Frame::new(self.width(), self.height());

        let hits = cast_view(view.world, &view.pose, &self.ray);
        self.paint_columns(&mut frame, &hits);

        let mut depth = DepthBuffer::from_hits(&hits);
        for &(x, y) in view.peers {
            self.draw_sprite(&mut frame, &mut depth, &view.pose, (x, y), &self.enemy);
        }
        for &(x, y) in view.projectiles.iter().chain(view.remote_projectiles) {
            self.draw_sprite(&mut frame, &mut depth, &view.pose, (x, y), &self.projectile);
        }

        stamp_minimap(&mut frame, view.world, &view.pose, view.peers);

        let (h, w) = (self.height() as i32, self.width() as i32);
        frame.set(h / 2, w / 2, Cell::plain('+'));

        if let Some(last) = self.height().checked_sub(1) {
            let hud = view.hud;
            let status = format!(
                "X={:.2} Y={:.2} A={:.2} Health={} FPS={:.2}",
                hud.x, hud.y, hud.heading, hud.health, hud.fps
            );
            frame.put_str(last, 0, &status);
        }

        frame
    }

    pub fn compose_lobby(&self, roster: &[RosterEntry]) -> Frame {
        let mut frame = Frame::new(self.width(), self.height());

        frame.put_str(1, 2, "ASCII ARENA - LOBBY");
        frame.put_str(3, 2, &format!("  {:<10} {:>6}  {}", "PLAYER", "HEALTH", "STATUS"));

        for (i, entry) in roster.iter().enumerate() {
            let marker = if entry.is_local { '>' } else { ' ' };
            let short: String = entry.id.chars().take(8).collect();
            let health = entry
                .health
                .map_or_else(|| "--".to_string(), |h| h.to_string());
            let status = if entry.ready { "READY" } else { "waiting" };
            frame.put_str(
                4 + i,
                2,
                &format!("{} {:<10} {:>6}  {}", marker, short, health, status),
            );
        }

        let hint_row = (6 + roster.len()).min(self.height().saturating_sub(1));
        frame.put_str(hint_row, 2, "Press Enter when ready");
        frame
    }

    fn paint_columns(&self, frame: &mut Frame, hits: &[ColumnHit]) {
        let h = self.height() as f32;
        for (x, hit) in hits.iter().enumerate() {
            let ceiling = (h / 2.0 - h / hit.distance) as i32;
            let floor = self.height() as i32 - ceiling;
            let wall = hit.shade(self.ray.max_depth).glyph();

            for y in 0..self.height() as i32 {
                let ch = if y <= ceiling {
                    ' '
                } else if y <= floor {
                    wall
                } else {
                    floor_glyph(y, self.height())
                };
                frame.set(y, x as i32, Cell::plain(ch));
            }
        }
    }

    fn draw_sprite(
        &self,
        frame: &mut Frame,
        depth: &mut DepthBuffer,
        pose: &Pose,
        target: (f32, f32),
        sprite: &Sprite,
    ) {
        let vec_x = target.0 - pose.x;
        let vec_y = target.1 - pose.y;
        let distance = (vec_x * vec_x + vec_y * vec_y).sqrt();

        let (eye_x, eye_y) = pose.forward();
        let angle = wrap_angle(eye_y.atan2(eye_x) - vec_y.atan2(vec_x));
        let half_fov = self.ray.fov / 2.0;
        if angle.abs() >= half_fov || distance < 0.5 || distance >= self.ray.max_depth {
            return;
        }

        let half_h = self.height() as f32 / 2.0;
        let ceiling = (half_h - half_h / distance) as i32;
        let height = (self.height() as i32 - ceiling) - ceiling;
        let width = (height as f32 / sprite.aspect()) as i32;
        if height <= 0 || width <= 0 {
            return;
        }
        let middle = (0.5 * (angle / half_fov) + 0.5) * self.width() as f32;

        for lx in 0..width {
            let column = (middle + lx as f32 - width as f32 / 2.0) as i32;
            if column < 0 || column >= self.width() as i32 {
                continue;
            }
            let column_idx = column as usize;
            let u = lx as f32 / width as f32;

            for ly in 0..height {
                let Some(cell) = sprite.sample(u, ly as f32 / height as f32) else {
                    continue;
                };
                if depth.is_visible(column_idx, distance) {
                    frame.set(ceiling + ly, column, cell);
                    depth.latch(column_idx, distance);
                }
            }
        }
    }
}

/// Floor band for screen row `y` below the horizon
pub fn floor_glyph(y: i32, screen_height: usize) -> char {
    let half = screen_height as f32 / 2.0;
    let b = 1.0 - (y as f32 - half) / half;
    if b < 0.25 {
        '#'
    } else if b < 0.5 {
        'x'
    } else if b < 0.75 {
        '.'
    } else if b < 0.9 {
        '-'
    } else {
        ' '
    }
}

fn wrap_angle(mut angle: f32) -> f32 {
    if angle < -PI {
        angle += 2.0 * PI;
    }
    if angle > PI {
        angle -= 2.0 * PI;
    }
    angle
}

fn stamp_minimap(frame: &mut Frame, world: &GridWorld, pose: &Pose, peers: &[(f32, f32)]) {
    for (y, row) in world.rows().enumerate() {
        for (x, tile) in row.iter().enumerate() {
            frame.set(y as i32, x as i32, Cell::plain(tile.glyph()));
        }
    }

    let mut mark = |x: f32, y: f32, ch: char| {
        let (cx, cy) = (x as i32, y as i32);
        if world.tile(cx, cy).is_some() {
            frame.set(cy, cx, Cell::plain(ch));
        }
    };
    for &(x, y) in peers {
        mark(x, y, 'E');
    }
    mark(pose.x, pose.y, 'P');
}
