//! Static tile map and collision queries

use std::fmt;

/// Default 16x16 arena, `#` is wall and `.` is open floor
pub const ARENA: [&str; 16] = [
    "################",
    "#..............#",
    "#..............#",
    "#....##.....####",
    "#..............#",
    "#..............#",
    "#.....##.......#",
    "#.....##.......#",
    "#..............#",
    "#..............#",
    "#........#######",
    "#..............#",
    "######.........#",
    "#..............#",
    "#..............#",
    "################",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tile {
    Empty,
    Wall,
}

impl Tile {
    pub fn glyph(self) -> char {
        match self {
            Tile::Empty => '.',
            Tile::Wall => '#',
        }
    }
}

/// Immutable row-major tile grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridWorld {
    width: usize,
    height: usize,
    tiles: Vec<Tile>,
}

impl GridWorld {
    /// Parse a map from ASCII rows
    pub fn parse<S: AsRef<str>>(rows: &[S]) -> Result<Self, WorldError> {
        let width = rows
            .first()
            .map(|row| row.as_ref().chars().count())
            .ok_or(WorldError::Empty)?;
        if width == 0 {
            return Err(WorldError::Empty);
        }

        let mut tiles = Vec::with_capacity(width * rows.len());
        for (y, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            let len = row.chars().count();
            if len != width {
                return Err(WorldError::RaggedRow { row: y, expected: width, found: len });
            }
            for (x, ch) in row.chars().enumerate() {
                let tile = match ch {
                    '#' => Tile::Wall,
                    '.' => Tile::Empty,
                    other => return Err(WorldError::UnknownGlyph { x, y, glyph: other }),
                };
                tiles.push(tile);
            }
        }

        Ok(Self {
            width,
            height: rows.len(),
            tiles,
        })
    }

    /// The built-in arena
    pub fn arena() -> Self {
        // ARENA is well-formed, the fallback never triggers
        Self::parse(&ARENA).unwrap_or_else(|_| Self {
            width: 1,
            height: 1,
            tiles: vec![Tile::Wall],
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Tile at integer cell coordinates, `None` when outside the map
    pub fn tile(&self, x: i32, y: i32) -> Option<Tile> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        if x >= self.width || y >= self.height {
            return None;
        }
        self.tiles.get(y * self.width + x).copied()
    }

    /// Whether the cell containing a world-space point blocks movement.
    /// Coordinates truncate toward zero; outside the map counts as wall.
    pub fn is_wall_at(&self, x: f32, y: f32) -> bool {
        !matches!(self.tile(x as i32, y as i32), Some(Tile::Empty))
    }

    /// Iterate rows as tile slices
    pub fn rows(&self) -> impl Iterator<Item = &[Tile]> {
        self.tiles.chunks(self.width)
    }
}

impl fmt::Display for GridWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            for tile in row {
                write!(f, "{}", tile.glyph())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Map loading errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WorldError {
    #[error("Map has no rows")]
    Empty,

    #[error("Row {row} has {found} tiles, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Unknown map glyph {glyph:?} at ({x}, {y})")]
    UnknownGlyph { x: usize, y: usize, glyph: char },
}
