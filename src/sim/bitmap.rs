//! Compact per-row occupancy bitmap of a grid.
//!
//! Each row is packed into an unsigned integer `T`; column `c` of a grid
//! `cols` wide lives at bit `cols - 1 - c`, so the leftmost column is the most
//! significant used bit. Only occupancy survives encoding, never colours.

use alloc::vec::Vec;
use core::{any, fmt, mem};
use num_traits::{PrimInt, Unsigned, Zero};

use super::common::GridError;

/// Occupancy snapshot of a `rows × cols` grid.
#[derive(Clone, PartialEq, Eq)]
pub struct GridBitmap<T = u32>
where
    T: PrimInt + Unsigned + Zero,
{
    rows: Vec<T>,
    cols: usize,
}

impl<T> GridBitmap<T>
where
    T: PrimInt + Unsigned + Zero,
{
    #[inline]
    fn capacity() -> usize {
        mem::size_of::<T>() * 8
    }

    #[inline]
    fn mask(cols: usize) -> T {
        if cols == Self::capacity() {
            !T::zero()
        } else {
            (T::one() << cols) - T::one()
        }
    }

    #[inline]
    fn check_cols(cols: usize) -> Result<(), GridError> {
        if cols > Self::capacity() {
            Err(GridError::TooManyColumns {
                cols,
                capacity: Self::capacity(),
            })
        } else {
            Ok(())
        }
    }

    /// Create an empty bitmap (all cells clear).
    pub fn new(rows: usize, cols: usize) -> Result<Self, GridError> {
        Self::check_cols(cols)?;
        Ok(Self {
            rows: alloc::vec![T::zero(); rows],
            cols,
        })
    }

    /// Build a bitmap from raw row masks, discarding bits beyond `cols`.
    pub fn from_rows(rows: Vec<T>, cols: usize) -> Result<Self, GridError> {
        Self::check_cols(cols)?;
        let mask = Self::mask(cols);
        Ok(Self {
            rows: rows.into_iter().map(|r| r & mask).collect(),
            cols,
        })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn col_count(&self) -> usize {
        self.cols
    }

    /// Raw row masks, top row first.
    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    #[inline]
    fn bit(&self, col: usize) -> T {
        T::one() << (self.cols - 1 - col)
    }

    #[inline]
    fn check_bounds(&self, row: usize, col: usize) -> Result<(), GridError> {
        if row >= self.rows.len() || col >= self.cols {
            Err(GridError::OutOfBounds { row, col })
        } else {
            Ok(())
        }
    }

    /// Gets the bit at (row, col).
    pub fn get(&self, row: usize, col: usize) -> Result<bool, GridError> {
        self.check_bounds(row, col)?;
        Ok(self.rows[row] & self.bit(col) != T::zero())
    }

    /// Sets the bit at (row, col).
    pub fn set(&mut self, row: usize, col: usize) -> Result<(), GridError> {
        self.check_bounds(row, col)?;
        self.rows[row] = self.rows[row] | self.bit(col);
        Ok(())
    }

    /// Clears the bit at (row, col).
    pub fn clear(&mut self, row: usize, col: usize) -> Result<(), GridError> {
        self.check_bounds(row, col)?;
        self.rows[row] = self.rows[row] & !self.bit(col);
        Ok(())
    }

    /// Number of occupied cells.
    pub fn count_ones(&self) -> usize {
        self.rows.iter().map(|r| r.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|r| r.is_zero())
    }

    /// Iterator over occupied `(row, col)` positions in row-major order.
    pub fn iter_set_bits(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let cols = self.cols;
        (0..self.rows.len() * cols).filter_map(move |i| {
            let (r, c) = (i / cols, i % cols);
            if self.rows[r] & self.bit(c) != T::zero() {
                Some((r, c))
            } else {
                None
            }
        })
    }
}

impl<T> fmt::Debug for GridBitmap<T>
where
    T: PrimInt + Unsigned + Zero + fmt::Binary,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "GridBitmap<{}> {}x{}:",
            any::type_name::<T>(),
            self.rows.len(),
            self.cols
        )?;
        fmt::Display::fmt(self, f)?;
        writeln!(f)
    }
}

impl<T> fmt::Display for GridBitmap<T>
where
    T: PrimInt + Unsigned + Zero + fmt::Binary,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (r, row) in self.rows.iter().enumerate() {
            for c in 0..self.cols {
                let bit = if *row & self.bit(c) != T::zero() { '■' } else { '□' };
                write!(f, "{} ", bit)?;
            }
            if r + 1 < self.rows.len() {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
