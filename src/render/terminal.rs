// src/render/terminal.rs

use std::f32::consts::TAU;

use super::scene::{Canvas, DrawCommand};

const FILL: char = '█';
const OUTLINE: char = '·';
const MARKER: char = '●';

/// Character-cell raster for draw commands. Cells are about twice as tall
/// as they are wide, so the scene canvas has two vertical units per row.
pub struct TerminalCanvas {
    cols: usize,
    rows: usize,
    cells: Vec<char>,
}

impl TerminalCanvas {
    pub fn new(cols: usize, rows: usize) -> Self {
        let cols = cols.max(4);
        let rows = rows.max(4);
        Self {
            cols,
            rows,
            cells: vec![' '; cols * rows],
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Scene-space canvas matching this grid.
    pub fn scene_canvas(&self) -> Canvas {
        Canvas::new(self.cols as f32, self.rows as f32 * 2.0)
    }

    pub fn resize(&mut self, cols: usize, rows: usize) {
        *self = Self::new(cols, rows);
    }

    pub fn draw(&mut self, commands: &[DrawCommand]) {
        for command in commands {
            match *command {
                DrawCommand::Clear { .. } => self.cells.fill(' '),
                DrawCommand::Circle { cx, cy, radius, .. } => {
                    let steps = ((TAU * radius).ceil() as usize).max(16);
                    for i in 0..steps {
                        let (sin, cos) = (i as f32 / steps as f32 * TAU).sin_cos();
                        self.plot(cx + radius * cos, cy + radius * sin, OUTLINE);
                    }
                }
                DrawCommand::Line { x1, y1, x2, y2, .. } => self.line(x1, y1, x2, y2),
                DrawCommand::Rect { x, y, width, height, .. } => {
                    self.rect(x, y, width, height)
                }
                DrawCommand::Dot { cx, cy, .. } => self.plot(cx, cy, MARKER),
            }
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.cells
            .chunks(self.cols)
            .map(|row| row.iter().collect())
            .collect()
    }

    fn plot(&mut self, x: f32, y: f32, ch: char) {
        if !x.is_finite() || !y.is_finite() || x < 0.0 || y < 0.0 {
            return;
        }
        let col = x.floor() as usize;
        let row = (y / 2.0).floor() as usize;
        if col < self.cols && row < self.rows {
            let cell = &mut self.cells[row * self.cols + col];
            // Outlines never overwrite spectrum marks.
            if ch != OUTLINE || *cell == ' ' {
                *cell = ch;
            }
        }
    }

    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        let dx = x2 - x1;
        let dy = (y2 - y1) / 2.0;
        // Zero-height spokes would paint over the base circle.
        if dx.abs() < 0.5 && dy.abs() < 0.5 {
            return;
        }
        let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as usize;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            self.plot(x1 + (x2 - x1) * t, y1 + (y2 - y1) * t, FILL);
        }
    }

    fn rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        if height <= 0.0 {
            return;
        }
        let col_start = x.max(0.0).floor() as usize;
        let col_end = ((x + width).ceil().max(0.0) as usize).min(self.cols);
        let row_start = (y.max(0.0) / 2.0).floor() as usize;
        let row_end = (((y + height) / 2.0).ceil().max(0.0) as usize).min(self.rows);
        for row in row_start..row_end {
            for col in col_start..col_end.max(col_start + 1).min(self.cols) {
                self.cells[row * self.cols + col] = FILL;
            }
        }
    }
}
