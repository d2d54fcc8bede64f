//! Falling pieces: shape matrices, rotation and spawn placement.

use alloc::vec::Vec;
use core::fmt;

use rand::Rng;

use super::common::Color;
use super::config::{NUM_SHAPES, SHAPES, SHAPE_COLORS};

/// Boolean shape matrix stored row-major.
#[derive(Clone, PartialEq, Eq)]
pub struct Shape {
    width: usize,
    height: usize,
    cells: Vec<bool>,
}

impl Shape {
    /// Build the shape at `index` in the fixed shape table.
    ///
    /// Returns `None` for indices outside the table.
    pub fn from_index(index: usize) -> Option<Self> {
        SHAPES.get(index).map(|rows| Self::from_rows(rows))
    }

    fn from_rows(rows: &[&[u8]]) -> Self {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.len());
        let cells = rows.iter().flat_map(|r| r.iter().map(|&c| c != 0)).collect();
        Self { width, height, cells }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Whether the cell at (`row`, `col`) of the matrix is part of the shape.
    pub fn get(&self, row: usize, col: usize) -> bool {
        row < self.height && col < self.width && self.cells[row * self.width + col]
    }

    /// Occupied `(col, row)` offsets within the matrix, in row-major scan order.
    pub fn iter_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, set)| **set)
            .map(move |(i, _)| (i % self.width, i / self.width))
    }

    /// The shape turned 90° clockwise.
    pub fn rotated_cw(&self) -> Self {
        let width = self.height;
        let height = self.width;
        let mut cells = Vec::with_capacity(self.cells.len());
        for r in 0..height {
            for c in 0..width {
                cells.push(self.get(self.height - 1 - c, r));
            }
        }
        Self { width, height, cells }
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Shape {}x{}:", self.width, self.height)?;
        for r in 0..self.height {
            for c in 0..self.width {
                write!(f, "{} ", if self.get(r, c) { '■' } else { '□' })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Shape index and colour chosen for an upcoming piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceSpec {
    pub shape_index: usize,
    pub color: Color,
}

impl PieceSpec {
    /// Pick a shape and a colour uniformly at random from the fixed palette.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            shape_index: rng.random_range(0..NUM_SHAPES),
            color: SHAPE_COLORS[rng.random_range(0..SHAPE_COLORS.len())],
        }
    }
}

/// The piece currently controlled by the local player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    shape_index: usize,
    shape: Shape,
    color: Color,
    col: i32,
    row: i32,
}

impl Piece {
    /// Spawn `spec` horizontally centred on row 0 of a grid `cols` wide.
    pub fn spawn(spec: PieceSpec, cols: usize) -> Self {
        let shape_index = spec.shape_index % NUM_SHAPES;
        let shape = Shape::from_rows(SHAPES[shape_index]);
        let col = (cols / 2) as i32 - (shape.width() / 2) as i32;
        Self {
            shape_index,
            shape,
            color: spec.color,
            col,
            row: 0,
        }
    }

    pub fn shape_index(&self) -> usize {
        self.shape_index
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn color(&self) -> Color {
        self.color
    }

    /// Top-left offset as `(column, row)`.
    pub fn offset(&self) -> (i32, i32) {
        (self.col, self.row)
    }

    pub fn set_offset(&mut self, col: i32, row: i32) {
        self.col = col;
        self.row = row;
    }

    pub fn set_shape(&mut self, shape: Shape) {
        self.shape = shape;
    }

    /// Replace shape and colour in place, keeping the offset.
    pub fn respec(&mut self, spec: PieceSpec) {
        if let Some(shape) = Shape::from_index(spec.shape_index) {
            self.shape_index = spec.shape_index;
            self.shape = shape;
            self.color = spec.color;
        }
    }

    /// Absolute `(col, row)` grid coordinates covered by the piece.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.shape
            .iter_cells()
            .map(move |(c, r)| (self.col + c as i32, self.row + r as i32))
    }
}
