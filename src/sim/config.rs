use core::time::Duration;

use super::common::Color;

/// Default play-field height.
pub const ROWS: usize = 20;
/// Default play-field width.
pub const COLUMNS: usize = 10;

/// Nominal render/simulation rate.
pub const FRAME_RATE: u32 = 60;
/// Gravity cadence at 60 Hz: one step every half second.
pub const DEFAULT_FRAMES_PER_MOVE: u32 = 30;
/// Rows descended per ordinary gravity step.
pub const SOFT_DROP_ROWS: i32 = 2;
/// Interval between full bitmap snapshots sent to the peer.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(10);
/// Capacity of the pending action deque.
pub const ACTION_QUEUE_CAPACITY: usize = 5;

pub const NUM_SHAPES: usize = 7;

/// Fixed shape table, indexed by the `next_shape` field of `game_state`.
/// Order: I, O, T, J, L, S, Z.
pub const SHAPES: [&[&[u8]]; NUM_SHAPES] = [
    &[&[1, 1, 1, 1]],
    &[&[1, 1], &[1, 1]],
    &[&[0, 1, 0], &[1, 1, 1]],
    &[&[1, 0, 0], &[1, 1, 1]],
    &[&[0, 0, 1], &[1, 1, 1]],
    &[&[0, 1, 1], &[1, 1, 0]],
    &[&[1, 1, 0], &[0, 1, 1]],
];

pub const SHAPE_COLORS: [Color; NUM_SHAPES] = [
    Color(255, 0, 0),
    Color(255, 125, 0),
    Color(255, 200, 0),
    Color(0, 255, 0),
    Color(0, 255, 255),
    Color(0, 0, 255),
    Color(127, 0, 127),
];

/// Single colour used for every cell of the mirrored peer grid.
pub const MIRROR_COLOR: Color = Color(5, 67, 200);

/// Points awarded by number of lines cleared at once.
pub const LINE_SCORES: [u64; 5] = [0, 40, 160, 360, 1600];

pub const SABOTAGE_THRESHOLDS: [u32; 3] = [300, 600, 900];
pub const SABOTAGE_MAX: u32 = 1000;
pub const SABOTAGE_RATE: u32 = 1;
/// Ticks a speed-up sabotage stays in force (10 s at 60 Hz).
pub const SPEEDUP_DURATION: u32 = 10 * 60;
/// Frames removed from the cadence by a speed-up sabotage.
pub const SPEEDUP_DELTA: u32 = 15;
/// Ticks a control scramble stays in force.
pub const SCRAMBLE_DURATION: u32 = 40 * 60;

/// Number of high-score slots kept by the leaderboard.
pub const HIGH_SCORE_SLOTS: usize = 5;

/// Score for clearing `lines` rows with a single lock.
pub fn score_for_lines(lines: usize) -> u64 {
    LINE_SCORES.get(lines).copied().unwrap_or(0)
}

/// Dimensions of one player's grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridDims {
    pub rows: usize,
    pub cols: usize,
}

impl Default for GridDims {
    fn default() -> Self {
        Self { rows: ROWS, cols: COLUMNS }
    }
}

/// Sabotage tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SabotageConfig {
    pub thresholds: [u32; 3],
    pub max: u32,
    pub rate: u32,
    pub speedup_duration: u32,
    pub speedup_delta: u32,
    pub scramble_duration: u32,
}

impl Default for SabotageConfig {
    fn default() -> Self {
        Self {
            thresholds: SABOTAGE_THRESHOLDS,
            max: SABOTAGE_MAX,
            rate: SABOTAGE_RATE,
            speedup_duration: SPEEDUP_DURATION,
            speedup_delta: SPEEDUP_DELTA,
            scramble_duration: SCRAMBLE_DURATION,
        }
    }
}

/// Parameters of one local simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub local_dims: GridDims,
    pub peer_dims: GridDims,
    pub frames_per_move: u32,
    pub sync_interval: Duration,
    pub sabotage: SabotageConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            local_dims: GridDims::default(),
            peer_dims: GridDims::default(),
            frames_per_move: DEFAULT_FRAMES_PER_MOVE,
            sync_interval: DEFAULT_SYNC_INTERVAL,
            sabotage: SabotageConfig::default(),
        }
    }
}
