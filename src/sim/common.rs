//! Common types for the simulation core: colours, cells and errors.

/// RGB colour of a filled cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(pub u8, pub u8, pub u8);

/// A single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    /// Empty play-field cell.
    #[default]
    Background,
    /// Occupied cell carrying the colour of the piece that locked there.
    Filled(Color),
}

impl Cell {
    /// Returns `true` unless the cell is background.
    #[inline]
    pub fn is_filled(&self) -> bool {
        matches!(self, Cell::Filled(_))
    }
}

/// Errors returned by grid and bitmap operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    /// Row or column index is outside the grid.
    OutOfBounds { row: usize, col: usize },
    /// Grid has more columns than the bitmap row type can hold.
    TooManyColumns { cols: usize, capacity: usize },
    /// Bitmap row count does not match the grid.
    RowCountMismatch { expected: usize, actual: usize },
    /// Bitmap column count does not match the grid.
    ColumnCountMismatch { expected: usize, actual: usize },
}

impl core::fmt::Display for GridError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            GridError::OutOfBounds { row, col } => {
                write!(f, "cell out of bounds: row={}, col={}", row, col)
            }
            GridError::TooManyColumns { cols, capacity } => {
                write!(f, "{} columns exceed bitmap row capacity of {} bits", cols, capacity)
            }
            GridError::RowCountMismatch { expected, actual } => {
                write!(f, "bitmap has {} rows, grid has {}", actual, expected)
            }
            GridError::ColumnCountMismatch { expected, actual } => {
                write!(f, "bitmap has {} columns, grid has {}", actual, expected)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for GridError {}

/// Current status of the local game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Playing,
    Over,
}
