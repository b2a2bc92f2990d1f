//! Billboard art for peers and projectiles

use super::frame::{Cell, Tint};

/// Remote player billboard. Blank cells are transparent.
pub const ENEMY_ART: [&str; 14] = [
    r"    .--.    ",
    r"   /    \   ",
    r"  | o  o |  ",
    r"   \ -- /   ",
    r"  __|  |__  ",
    r" /  |==|  \ ",
    r"/ /|    |\ \",
    r"|/ |    | \|",
    r"   |_/\_|   ",
    r"   |    |   ",
    r"   | || |   ",
    r"   | || |   ",
    r"  _| || |_  ",
    r" (___||___) ",
];

pub const PROJECTILE_ART: [&str; 1] = ["*"];

#[derive(Debug, Clone, Copy)]
pub struct Sprite {
    rows: &'static [&'static str],
    columns: usize,
    tint: Tint,
}

impl Sprite {
    pub fn new(rows: &'static [&'static str], tint: Tint) -> Self {
        let columns = rows
            .iter()
            .map(|r| r.chars().count())
            .max()
            .unwrap_or(0);
        Self {
            rows,
            columns,
            tint,
        }
    }

    pub fn enemy() -> Self {
        Self::new(&ENEMY_ART, Tint::Enemy)
    }

    pub fn projectile() -> Self {
        Self::new(&PROJECTILE_ART, Tint::Plain)
    }

    /// Rows over columns of the art
    pub fn aspect(&self) -> f32 {
        if self.columns == 0 {
            return 1.0;
        }
        self.rows.len() as f32 / self.columns as f32
    }

    /// Art cell at normalized `(u, v)` in `[0, 1)`.
    /// `None` for transparent cells and anything outside the art.
    pub fn sample(&self, u: f32, v: f32) -> Option<Cell> {
        if !(0.0..1.0).contains(&u) || !(0.0..1.0).contains(&v) {
            return None;
        }
        let col = (u * self.columns as f32) as usize;
        let row = (v * self.rows.len() as f32) as usize;

        let ch = self.rows.get(row)?.chars().nth(col)?;
        if ch == ' ' {
            return None;
        }
        Some(Cell { ch, tint: self.tint })
    }
}
