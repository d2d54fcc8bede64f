//! Dual-grid falling-block simulation (no_std compatible)
//!
//! Pure game logic: the local grid with gravity, collision, line clearing and
//! scoring, the mirrored peer grid, and the sabotage subsystem. Nothing here
//! touches sockets, tasks or the wall clock; time enters as a `Duration`
//! argument and peer traffic as [`Inbound`]/[`Outbound`] events.

pub mod bitmap;
pub mod common;
pub mod config;
pub mod events;
pub mod game;
pub mod game_over;
pub mod grid;
pub mod mirror;
pub mod piece;
pub mod sabotage;

pub use bitmap::GridBitmap;
pub use common::{Cell, Color, GameStatus, GridError};
pub use config::*;
pub use events::{Action, Inbound, Outbound, TickOutcome};
pub use game::GameEngine;
pub use game_over::{GameOverEvent, GameOverFlow, GameOverStage};
pub use grid::Grid;
pub use mirror::{MirrorError, MirrorUpdate, PeerMirror};
pub use piece::{Piece, PieceSpec, Shape};
pub use sabotage::{ControlMapping, SabotageEffects, SabotageKind, SabotageMeter};
