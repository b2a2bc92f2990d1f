//! Character grid the compositor paints into

use std::fmt::Write as _;

use crossterm::style::Stylize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tint {
    Plain,
    /// Remote players, drawn red
    Enemy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub tint: Tint,
}

impl Cell {
    pub const BLANK: Cell = Cell::plain(' ');

    pub const fn plain(ch: char) -> Self {
        Self {
            ch,
            tint: Tint::Plain,
        }
    }
}

/// Flat row-major `width * height` grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Frame {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::BLANK; width * height],
        }
    }

    #[cfg(test)]
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[cfg(test)]
    pub fn get(&self, row: usize, col: usize) -> Option<Cell> {
        if row >= self.height || col >= self.width {
            return None;
        }
        self.cells.get(row * self.width + col).copied()
    }

    /// Write one cell; off-grid writes are clipped
    pub fn set(&mut self, row: i32, col: i32, cell: Cell) {
        if row < 0 || col < 0 {
            return;
        }
        let (row, col) = (row as usize, col as usize);
        if row >= self.height || col >= self.width {
            return;
        }
        if let Some(slot) = self.cells.get_mut(row * self.width + col) {
            *slot = cell;
        }
    }

    /// Write plain text starting at a cell, clipped at the right edge
    pub fn put_str(&mut self, row: usize, col: usize, text: &str) {
        for (i, ch) in text.chars().enumerate() {
            self.set(row as i32, (col + i) as i32, Cell::plain(ch));
        }
    }

    /// Row as bare characters
    #[cfg(test)]
    pub fn row_text(&self, row: usize) -> String {
        self.row_cells(row).iter().map(|c| c.ch).collect()
    }

    /// Row with ANSI styling for tinted runs
    pub fn row_styled(&self, row: usize) -> String {
        let mut out = String::with_capacity(self.width * 2);
        let mut run = String::new();
        let mut run_tint = Tint::Plain;

        for cell in self.row_cells(row) {
            if cell.tint != run_tint && !run.is_empty() {
                push_run(&mut out, &run, run_tint);
                run.clear();
            }
            run_tint = cell.tint;
            run.push(cell.ch);
        }
        push_run(&mut out, &run, run_tint);
        out
    }

    fn row_cells(&self, row: usize) -> &[Cell] {
        let start = (row * self.width).min(self.cells.len());
        let end = (start + self.width).min(self.cells.len());
        &self.cells[start..end]
    }
}

fn push_run(out: &mut String, run: &str, tint: Tint) {
    match tint {
        Tint::Plain => out.push_str(run),
        Tint::Enemy => {
            let _ = write!(out, "{}", run.red());
        }
    }
}
