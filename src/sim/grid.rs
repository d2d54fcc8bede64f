//! Play-field grid: collision, locking and line clearing.

use alloc::vec::Vec;
use core::fmt;
use num_traits::{PrimInt, Unsigned, Zero};

use super::bitmap::GridBitmap;
use super::common::{Cell, Color, GridError};
use super::config::GridDims;
use super::piece::Shape;

/// Fixed-size `rows × cols` matrix of cells, row 0 at the top.
#[derive(Clone, PartialEq, Eq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Create an all-background grid.
    pub fn new(dims: GridDims) -> Self {
        Self {
            rows: dims.rows,
            cols: dims.cols,
            cells: alloc::vec![Cell::Background; dims.rows * dims.cols],
        }
    }

    pub fn dims(&self) -> GridDims {
        GridDims {
            rows: self.rows,
            cols: self.cols,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    fn index(&self, row: usize, col: usize) -> Result<usize, GridError> {
        if row >= self.rows || col >= self.cols {
            Err(GridError::OutOfBounds { row, col })
        } else {
            Ok(row * self.cols + col)
        }
    }

    pub fn get(&self, row: usize, col: usize) -> Result<Cell, GridError> {
        Ok(self.cells[self.index(row, col)?])
    }

    pub fn set(&mut self, row: usize, col: usize, cell: Cell) -> Result<(), GridError> {
        let idx = self.index(row, col)?;
        self.cells[idx] = cell;
        Ok(())
    }

    /// Cells of one row, left to right.
    pub fn row(&self, row: usize) -> &[Cell] {
        &self.cells[row * self.cols..(row + 1) * self.cols]
    }

    /// Whether `shape` placed with its top-left at (`col`, `row`) stays inside
    /// the side and bottom walls and overlaps no filled cell.
    ///
    /// Cells above the top edge are allowed, as long as the column is valid.
    pub fn is_valid_position(&self, shape: &Shape, col: i32, row: i32) -> bool {
        shape.iter_cells().all(|(dc, dr)| {
            let c = col + dc as i32;
            let r = row + dr as i32;
            if c < 0 || c >= self.cols as i32 || r >= self.rows as i32 {
                return false;
            }
            r < 0 || !self.cells[r as usize * self.cols + c as usize].is_filled()
        })
    }

    /// Number of rows `shape` can fall from (`col`, `row`) before colliding.
    pub fn max_fall_distance(&self, shape: &Shape, col: i32, row: i32) -> i32 {
        let mut distance = 0;
        while self.is_valid_position(shape, col, row + distance + 1) {
            distance += 1;
        }
        distance
    }

    /// Write `shape` into the grid in `color` and return the absolute
    /// `(col, row)` coordinates written, in shape scan order.
    ///
    /// Cells falling outside the grid are skipped.
    pub fn lock(&mut self, shape: &Shape, col: i32, row: i32, color: Color) -> Vec<(i32, i32)> {
        let mut written = Vec::with_capacity(4);
        for (dc, dr) in shape.iter_cells() {
            let c = col + dc as i32;
            let r = row + dr as i32;
            if c < 0 || r < 0 {
                continue;
            }
            if self.set(r as usize, c as usize, Cell::Filled(color)).is_ok() {
                written.push((c, r));
            }
        }
        written
    }

    /// Stamp absolute `(col, row)` coordinates in `color`, ignoring any that
    /// fall outside the grid. Returns how many were written.
    pub fn stamp(&mut self, coords: &[(i32, i32)], color: Color) -> usize {
        coords
            .iter()
            .filter(|&&(c, r)| {
                c >= 0 && r >= 0 && self.set(r as usize, c as usize, Cell::Filled(color)).is_ok()
            })
            .count()
    }

    /// Remove every row with no background cell, prepend the same number of
    /// empty rows, and return the number of rows removed.
    pub fn clear_lines(&mut self) -> usize {
        let cols = self.cols;
        let mut kept: Vec<Cell> = Vec::with_capacity(self.cells.len());
        for chunk in self.cells.chunks(cols.max(1)) {
            if chunk.iter().any(|c| !c.is_filled()) {
                kept.extend_from_slice(chunk);
            }
        }
        let cleared = self.rows - kept.len() / cols.max(1);
        if cleared == 0 {
            return 0;
        }
        let mut cells = alloc::vec![Cell::Background; cleared * cols];
        cells.extend(kept);
        self.cells = cells;
        cleared
    }

    /// Encode the grid's occupancy.
    pub fn to_bitmap<T>(&self) -> Result<GridBitmap<T>, GridError>
    where
        T: PrimInt + Unsigned + Zero,
    {
        let mut bitmap = GridBitmap::new(self.rows, self.cols)?;
        for r in 0..self.rows {
            for c in 0..self.cols {
                if self.cells[r * self.cols + c].is_filled() {
                    bitmap.set(r, c)?;
                }
            }
        }
        Ok(bitmap)
    }

    /// Overwrite every cell from `bitmap`: set bits become `color`, clear bits
    /// become background.
    pub fn apply_bitmap<T>(&mut self, bitmap: &GridBitmap<T>, color: Color) -> Result<(), GridError>
    where
        T: PrimInt + Unsigned + Zero,
    {
        if bitmap.row_count() != self.rows {
            return Err(GridError::RowCountMismatch {
                expected: self.rows,
                actual: bitmap.row_count(),
            });
        }
        if bitmap.col_count() != self.cols {
            return Err(GridError::ColumnCountMismatch {
                expected: self.cols,
                actual: bitmap.col_count(),
            });
        }
        for r in 0..self.rows {
            for c in 0..self.cols {
                self.cells[r * self.cols + c] = if bitmap.get(r, c)? {
                    Cell::Filled(color)
                } else {
                    Cell::Background
                };
            }
        }
        Ok(())
    }

    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_filled()).count()
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Grid {}x{}:", self.rows, self.cols)?;
        for r in 0..self.rows {
            for cell in self.row(r) {
                write!(f, "{} ", if cell.is_filled() { '■' } else { '□' })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
