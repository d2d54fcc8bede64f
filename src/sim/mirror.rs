//! Display-only reconstruction of the opponent's grid.

use alloc::vec::Vec;
use core::fmt;

use super::bitmap::GridBitmap;
use super::common::GridError;
use super::config::{GridDims, MIRROR_COLOR, NUM_SHAPES};
use super::grid::Grid;

/// Errors raised while applying peer updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorError {
    /// Snapshot row count does not match the mirrored grid.
    RowCountMismatch { expected: usize, actual: usize },
    /// Mirror dimensions cannot be represented as a `u32` bitmap.
    Grid(GridError),
}

impl fmt::Display for MirrorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MirrorError::RowCountMismatch { expected, actual } => {
                write!(f, "snapshot has {} rows, mirror has {}", actual, expected)
            }
            MirrorError::Grid(e) => write!(f, "grid error: {}", e),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for MirrorError {}

impl From<GridError> for MirrorError {
    fn from(e: GridError) -> Self {
        MirrorError::Grid(e)
    }
}

/// Whether an incoming update changed the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorUpdate {
    Applied,
    /// Already seen or older than what was applied.
    Stale,
}

impl MirrorUpdate {
    pub fn is_applied(&self) -> bool {
        matches!(self, MirrorUpdate::Applied)
    }
}

/// Local view of the peer's grid, next shape and score.
#[derive(Debug, Clone)]
pub struct PeerMirror {
    grid: Grid,
    next_shape: Option<usize>,
    score: u64,
    last_game_state: Option<u64>,
    last_snapshot: Option<u64>,
}

impl PeerMirror {
    pub fn new(dims: GridDims) -> Self {
        Self {
            grid: Grid::new(dims),
            next_shape: None,
            score: 0,
            last_game_state: None,
            last_snapshot: None,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Shape index the peer has queued next, once known.
    pub fn next_shape(&self) -> Option<usize> {
        self.next_shape
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    /// Stamp a locked piece and clear any rows it completed.
    ///
    /// Coordinates outside the mirror and unknown shape indices are ignored.
    /// An update whose `frame_number` is not newer than the last applied one
    /// is dropped.
    pub fn apply_game_state(
        &mut self,
        frame_number: u64,
        piece_coordinates: &[(i32, i32)],
        next_shape: usize,
    ) -> MirrorUpdate {
        if self.last_game_state.is_some_and(|last| frame_number <= last) {
            return MirrorUpdate::Stale;
        }
        self.last_game_state = Some(frame_number);
        self.grid.stamp(piece_coordinates, MIRROR_COLOR);
        self.grid.clear_lines();
        if next_shape < NUM_SHAPES {
            self.next_shape = Some(next_shape);
        }
        MirrorUpdate::Applied
    }

    /// Overwrite the whole mirror from a snapshot.
    ///
    /// A snapshot with the wrong number of rows leaves the mirror untouched.
    pub fn apply_snapshot(
        &mut self,
        frame_number: u64,
        grid_bitmap: &[u32],
        score: u64,
    ) -> Result<MirrorUpdate, MirrorError> {
        if grid_bitmap.len() != self.grid.rows() {
            return Err(MirrorError::RowCountMismatch {
                expected: self.grid.rows(),
                actual: grid_bitmap.len(),
            });
        }
        if self.last_snapshot.is_some_and(|last| frame_number <= last) {
            return Ok(MirrorUpdate::Stale);
        }
        let bitmap = GridBitmap::<u32>::from_rows(Vec::from(grid_bitmap), self.grid.cols())?;
        self.grid.apply_bitmap(&bitmap, MIRROR_COLOR)?;
        self.score = score;
        self.last_snapshot = Some(frame_number);
        Ok(MirrorUpdate::Applied)
    }

    /// Forget everything, as at the start of a new match.
    pub fn reset(&mut self) {
        *self = Self::new(self.grid.dims());
    }
}
