use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::mem;
use core::time::Duration;

use rand::rngs::SmallRng;
use rand::SeedableRng;

use super::bitmap::GridBitmap;
use super::common::{GameStatus, GridError};
use super::config::{score_for_lines, EngineConfig, ACTION_QUEUE_CAPACITY, SOFT_DROP_ROWS};
use super::events::{Action, Inbound, Outbound, TickOutcome};
use super::game_over::{GameOverEvent, GameOverFlow};
use super::grid::Grid;
use super::mirror::PeerMirror;
use super::piece::{Piece, PieceSpec, Shape};
use super::sabotage::{ControlMapping, SabotageEffects, SabotageKind, SabotageMeter};

/// Attempts at finding a re-rolled piece that fits before giving up.
const REROLL_ATTEMPTS: usize = 4;

/// Authoritative simulation of the local player's grid, plus the mirrored
/// view of the peer.
///
/// The engine never touches the network: peer traffic is fed in as
/// [`Inbound`] events and everything to send is collected as [`Outbound`]
/// events, taken with [`GameEngine::take_outbound`].
pub struct GameEngine {
    config: EngineConfig,
    rng: SmallRng,
    grid: Grid,
    piece: Piece,
    next: PieceSpec,
    score: u64,
    status: GameStatus,
    frames_per_move: u32,
    tick_count: u64,
    frame_number: u64,
    sync_frame_number: u64,
    last_sync: Duration,
    hard_drop_pending: bool,
    bitmap: GridBitmap<u32>,
    actions: VecDeque<Action>,
    meter: SabotageMeter,
    effects: SabotageEffects,
    mirror: PeerMirror,
    outbox: Vec<Outbound>,
    rejected_inbound: u64,
    post_game: Option<GameOverFlow>,
    post_game_events: Vec<GameOverEvent>,
}

impl GameEngine {
    /// Create an engine with a fresh grid and a random first piece.
    ///
    /// Fails only when the local grid is too wide for a `u32` bitmap.
    pub fn new(config: EngineConfig, seed: u64) -> Result<Self, GridError> {
        let mut rng = SmallRng::seed_from_u64(seed);
        let grid = Grid::new(config.local_dims);
        let bitmap = grid.to_bitmap()?;
        let piece = Piece::spawn(PieceSpec::random(&mut rng), config.local_dims.cols);
        let next = PieceSpec::random(&mut rng);
        Ok(Self {
            rng,
            grid,
            piece,
            next,
            score: 0,
            status: GameStatus::Playing,
            frames_per_move: config.frames_per_move.max(1),
            tick_count: 0,
            frame_number: 0,
            sync_frame_number: 0,
            last_sync: Duration::ZERO,
            hard_drop_pending: false,
            bitmap,
            actions: VecDeque::with_capacity(ACTION_QUEUE_CAPACITY),
            meter: SabotageMeter::new(&config.sabotage),
            effects: SabotageEffects::new(),
            mirror: PeerMirror::new(config.peer_dims),
            outbox: Vec::new(),
            rejected_inbound: 0,
            post_game: None,
            post_game_events: Vec::new(),
            config,
        })
    }

    /// Reset the local game for a rematch.
    ///
    /// Outbound frame counters keep counting so the peer's mirror never
    /// mistakes new updates for stale ones.
    pub fn restart(&mut self, now: Duration) {
        self.grid = Grid::new(self.config.local_dims);
        if let Ok(bitmap) = self.grid.to_bitmap() {
            self.bitmap = bitmap;
        }
        self.piece = Piece::spawn(PieceSpec::random(&mut self.rng), self.grid.cols());
        self.next = PieceSpec::random(&mut self.rng);
        self.score = 0;
        self.status = GameStatus::Playing;
        self.frames_per_move = self.config.frames_per_move.max(1);
        self.tick_count = 0;
        self.last_sync = now;
        self.hard_drop_pending = false;
        self.actions.clear();
        self.meter = SabotageMeter::new(&self.config.sabotage);
        self.effects = SabotageEffects::new();
        self.mirror.reset();
        self.outbox.clear();
        self.post_game = None;
        self.post_game_events.clear();
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Mutable access to the local grid, for scripted setups.
    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    pub fn piece(&self) -> &Piece {
        &self.piece
    }

    /// Replace the active piece.
    pub fn set_piece(&mut self, piece: Piece) {
        self.piece = piece;
    }

    /// Shape and colour queued to spawn after the next lock.
    pub fn next_piece(&self) -> PieceSpec {
        self.next
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn is_over(&self) -> bool {
        self.status == GameStatus::Over
    }

    pub fn frames_per_move(&self) -> u32 {
        self.frames_per_move
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Number of the last `game_state` emitted; equals pieces locked.
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Number of the last snapshot emitted.
    pub fn sync_frame_number(&self) -> u64 {
        self.sync_frame_number
    }

    pub fn hard_drop_pending(&self) -> bool {
        self.hard_drop_pending
    }

    /// Occupancy bitmap as of the last lock, before its rows were cleared.
    pub fn bitmap(&self) -> &GridBitmap<u32> {
        &self.bitmap
    }

    pub fn meter(&self) -> &SabotageMeter {
        &self.meter
    }

    pub fn meter_mut(&mut self) -> &mut SabotageMeter {
        &mut self.meter
    }

    pub fn effects(&self) -> &SabotageEffects {
        &self.effects
    }

    pub fn mapping(&self) -> &ControlMapping {
        self.effects.mapping()
    }

    pub fn mirror(&self) -> &PeerMirror {
        &self.mirror
    }

    /// Inbound events that were rejected as malformed.
    pub fn rejected_inbound(&self) -> u64 {
        self.rejected_inbound
    }

    /// Post-game flow, once entered.
    pub fn post_game(&self) -> Option<&GameOverFlow> {
        self.post_game.as_ref()
    }

    pub fn pending_actions(&self) -> impl Iterator<Item = &Action> + '_ {
        self.actions.iter()
    }

    /// Queue a physical input for the next tick.
    ///
    /// While playing, an input equal to the last queued one is coalesced
    /// away. When the queue is full the oldest input is dropped. Returns
    /// whether the input was queued.
    pub fn push_action(&mut self, action: Action) -> bool {
        if !self.is_over() && self.actions.back() == Some(&action) {
            return false;
        }
        if self.actions.len() == ACTION_QUEUE_CAPACITY {
            self.actions.pop_front();
        }
        self.actions.push_back(action);
        true
    }

    /// Everything produced since the last call, oldest first.
    pub fn take_outbound(&mut self) -> Vec<Outbound> {
        mem::take(&mut self.outbox)
    }

    /// Begin the post-game flow; initials are requested when `qualifies`.
    pub fn enter_post_game(&mut self, qualifies: bool) {
        if self.is_over() && self.post_game.is_none() {
            self.post_game = Some(GameOverFlow::new(qualifies));
        }
    }

    pub fn take_post_game_events(&mut self) -> Vec<GameOverEvent> {
        mem::take(&mut self.post_game_events)
    }

    /// Advance one frame.
    ///
    /// `now` is the monotonic time since the session started and drives the
    /// periodic snapshot.
    pub fn tick<I>(&mut self, now: Duration, inbound: I) -> TickOutcome
    where
        I: IntoIterator<Item = Inbound>,
    {
        for event in inbound {
            self.apply_inbound(event);
        }

        if self.is_over() {
            self.drain_post_game();
            return TickOutcome::Continue;
        }

        self.effects.tick(&mut self.frames_per_move);
        self.meter.tick();

        while let Some(action) = self.actions.pop_front() {
            self.apply_action(action);
        }

        let mut outcome = TickOutcome::Continue;
        if self.hard_drop_pending || self.tick_count % u64::from(self.frames_per_move) == 0 {
            outcome = self.gravity_step();
        }
        if let TickOutcome::GameOver { .. } = outcome {
            return outcome;
        }

        self.tick_count += 1;
        if now.saturating_sub(self.last_sync) >= self.config.sync_interval {
            self.emit_sync();
            self.last_sync = now;
        }
        outcome
    }

    /// Apply one peer event immediately.
    pub fn apply_inbound(&mut self, event: Inbound) {
        match event {
            Inbound::GameState {
                frame_number,
                piece_coordinates,
                next_shape,
            } => {
                self.mirror
                    .apply_game_state(frame_number, &piece_coordinates, next_shape);
            }
            Inbound::SyncFrame {
                frame_number,
                grid_bitmap,
                score,
            } => {
                if self
                    .mirror
                    .apply_snapshot(frame_number, &grid_bitmap, score)
                    .is_err()
                {
                    self.rejected_inbound += 1;
                }
            }
            Inbound::Sabotage { index } => match SabotageKind::from_index(index) {
                Some(kind) if !self.is_over() => self.apply_effect(kind),
                Some(_) => {}
                None => self.rejected_inbound += 1,
            },
        }
    }

    /// Apply a sabotage effect to the local player.
    pub fn apply_effect(&mut self, kind: SabotageKind) {
        match kind {
            SabotageKind::Reroll => {
                let (col, row) = self.piece.offset();
                for _ in 0..REROLL_ATTEMPTS {
                    let spec = PieceSpec::random(&mut self.rng);
                    let fits = Shape::from_index(spec.shape_index)
                        .is_some_and(|s| self.grid.is_valid_position(&s, col, row));
                    if fits {
                        self.piece.respec(spec);
                        break;
                    }
                }
            }
            SabotageKind::SpeedUp => {
                self.effects
                    .speed_up(&mut self.frames_per_move, &self.config.sabotage);
            }
            SabotageKind::Scramble => {
                self.effects.scramble(&mut self.rng, &self.config.sabotage);
            }
        }
    }

    fn apply_action(&mut self, action: Action) {
        let (col, row) = self.piece.offset();
        match self.effects.mapping().resolve(action) {
            Action::Rotate => {
                let rotated = self.piece.shape().rotated_cw();
                if self.grid.is_valid_position(&rotated, col, row) {
                    self.piece.set_shape(rotated);
                }
            }
            Action::HardDrop => self.hard_drop_pending = true,
            Action::MoveLeft => self.try_shift(col - 1, row),
            Action::MoveRight => self.try_shift(col + 1, row),
            Action::Sabotage => {
                if let Some(kind) = self.meter.trigger() {
                    self.outbox.push(Outbound::Sabotage { index: kind.index() });
                }
            }
        }
    }

    fn try_shift(&mut self, col: i32, row: i32) {
        if self.grid.is_valid_position(self.piece.shape(), col, row) {
            self.piece.set_offset(col, row);
        }
    }

    fn gravity_step(&mut self) -> TickOutcome {
        let (col, row) = self.piece.offset();
        let distance = self.grid.max_fall_distance(self.piece.shape(), col, row);
        if distance == 0 {
            self.hard_drop_pending = false;
            return self.lock_piece();
        }
        let step = if self.hard_drop_pending {
            self.hard_drop_pending = false;
            distance
        } else {
            distance.min(SOFT_DROP_ROWS)
        };
        self.piece.set_offset(col, row + step);
        TickOutcome::Continue
    }

    fn lock_piece(&mut self) -> TickOutcome {
        let (col, row) = self.piece.offset();
        let piece_coordinates = self
            .grid
            .lock(self.piece.shape(), col, row, self.piece.color());
        self.frame_number += 1;
        self.outbox.push(Outbound::GameState {
            frame_number: self.frame_number,
            piece_coordinates,
            next_shape: self.next.shape_index,
        });

        // Snapshot is taken before completed rows are removed.
        if let Ok(bitmap) = self.grid.to_bitmap() {
            self.bitmap = bitmap;
        }
        let cleared = self.grid.clear_lines();
        self.score += score_for_lines(cleared);

        self.piece = Piece::spawn(self.next, self.grid.cols());
        self.next = PieceSpec::random(&mut self.rng);
        let (col, row) = self.piece.offset();
        if self.grid.is_valid_position(self.piece.shape(), col, row) {
            return TickOutcome::Continue;
        }

        self.status = GameStatus::Over;
        self.actions.clear();
        self.hard_drop_pending = false;
        self.effects = SabotageEffects::new();
        self.frames_per_move = self.config.frames_per_move.max(1);
        self.emit_sync();
        TickOutcome::GameOver {
            final_score: self.score,
        }
    }

    fn emit_sync(&mut self) {
        self.sync_frame_number += 1;
        self.outbox.push(Outbound::SyncFrame {
            frame_number: self.sync_frame_number,
            grid_bitmap: self.bitmap.rows().to_vec(),
            score: self.score,
        });
    }

    fn drain_post_game(&mut self) {
        let Some(flow) = self.post_game.as_mut() else {
            return;
        };
        while let Some(action) = self.actions.pop_front() {
            if let Some(event) = flow.handle(action) {
                self.post_game_events.push(event);
            }
        }
    }
}
