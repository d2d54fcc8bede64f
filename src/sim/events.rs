//! Events flowing into and out of the simulation core.

use alloc::vec::Vec;

/// Abstract input tags delivered by an input source.
///
/// The four movement tags name a physical control; which effect they have is
/// decided by the current [`ControlMapping`](super::sabotage::ControlMapping).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Rotate,
    HardDrop,
    MoveLeft,
    MoveRight,
    Sabotage,
}

impl Action {
    /// Movement tags subject to control scrambling, in mapping order.
    pub const MOVEMENT: [Action; 4] = [
        Action::Rotate,
        Action::HardDrop,
        Action::MoveLeft,
        Action::MoveRight,
    ];

    /// Wire/config name of the tag.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Rotate => "rotate",
            Action::HardDrop => "hard_drop",
            Action::MoveLeft => "move_left",
            Action::MoveRight => "move_right",
            Action::Sabotage => "sabotage",
        }
    }

    /// Parse a tag name as produced by [`Action::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "rotate" => Some(Action::Rotate),
            "hard_drop" => Some(Action::HardDrop),
            "move_left" => Some(Action::MoveLeft),
            "move_right" => Some(Action::MoveRight),
            "sabotage" => Some(Action::Sabotage),
            _ => None,
        }
    }
}

/// Peer traffic consumed by the simulation once per tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// The peer locked a piece.
    GameState {
        frame_number: u64,
        piece_coordinates: Vec<(i32, i32)>,
        next_shape: usize,
    },
    /// Full occupancy snapshot of the peer grid.
    SyncFrame {
        frame_number: u64,
        grid_bitmap: Vec<u32>,
        score: u64,
    },
    /// The peer sabotaged us.
    Sabotage { index: u8 },
}

/// Messages the simulation wants delivered to the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Piece lock notification, best-effort.
    GameState {
        frame_number: u64,
        piece_coordinates: Vec<(i32, i32)>,
        next_shape: usize,
    },
    /// Grid snapshot, sent through the reliable path.
    SyncFrame {
        frame_number: u64,
        grid_bitmap: Vec<u32>,
        score: u64,
    },
    /// Sabotage trigger, best-effort.
    Sabotage { index: u8 },
}

/// Result of one simulation tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    /// The freshly spawned piece did not fit; the game just ended.
    GameOver { final_score: u64 },
}
