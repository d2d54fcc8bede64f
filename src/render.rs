#![cfg(feature = "std")]

use std::fmt::Write as _;
use std::io::{self, Write};

use crate::scores::HighScoreEntry;
use crate::session::SessionPhase;
use crate::sim::{Cell, GameEngine, GameOverStage, Grid, Shape};

/// Read-only snapshot handed to the renderer once per frame.
pub struct FrameView<'a> {
    pub frame: u64,
    pub phase: SessionPhase,
    pub engine: &'a GameEngine,
    /// Whole seconds left while counting down.
    pub countdown: Option<u64>,
    pub leaderboard: &'a [HighScoreEntry],
}

pub trait RenderSink: Send {
    fn present(&mut self, view: &FrameView<'_>);
}

/// Renders nothing.
pub struct NullRender;

impl RenderSink for NullRender {
    fn present(&mut self, _view: &FrameView<'_>) {}
}

/// Plain-text renderer that redraws every `every` frames.
pub struct TextRender {
    out: Box<dyn Write + Send>,
    every: u64,
}

impl TextRender {
    pub fn stdout(every: u64) -> Self {
        Self::new(Box::new(io::stdout()), every)
    }

    pub fn new(out: Box<dyn Write + Send>, every: u64) -> Self {
        Self {
            out,
            every: every.max(1),
        }
    }
}

impl RenderSink for TextRender {
    fn present(&mut self, view: &FrameView<'_>) {
        if view.frame % self.every != 0 {
            return;
        }
        let text = draw(view);
        let _ = self.out.write_all(text.as_bytes());
        let _ = self.out.flush();
    }
}

/// Full text rendering of `view`.
pub fn draw(view: &FrameView<'_>) -> String {
    let mut s = String::new();
    match view.phase {
        SessionPhase::Idle => s.push_str("Press enter to find a match\n"),
        SessionPhase::MatchmakingInProgress => s.push_str("Looking for opponent...\n"),
        SessionPhase::MatchmakingFailed => s.push_str("No opponent found. Press enter to retry\n"),
        SessionPhase::MatchFound => s.push_str("Match found! Press enter to start\n"),
        SessionPhase::Countdown => {
            let _ = writeln!(s, "Starting in {}", view.countdown.unwrap_or(0));
        }
        SessionPhase::Playing => draw_boards(&mut s, view.engine),
        SessionPhase::GameOver => draw_game_over(&mut s, view),
    }
    s
}

fn cell_char(cell: &Cell) -> char {
    if cell.is_filled() {
        '#'
    } else {
        '.'
    }
}

fn draw_boards(s: &mut String, engine: &GameEngine) {
    let grid = engine.grid();
    let mirror = engine.mirror();
    let piece_cells: Vec<(i32, i32)> = engine.piece().cells().collect();
    let meter = engine.meter();
    let _ = writeln!(
        s,
        "Score {:<8} Opponent {:<8} Sabotage {:>3}% {:?}",
        engine.score(),
        mirror.score(),
        (meter.fill() * 100.0) as u32,
        meter.available()
    );
    if !engine.mapping().is_identity() {
        s.push_str("Controls scrambled!\n");
    }
    let rows = grid.rows().max(mirror.grid().rows());
    for r in 0..rows {
        draw_row(s, grid, r, |c| piece_cells.contains(&(c as i32, r as i32)));
        s.push_str("   ");
        draw_row(s, mirror.grid(), r, |_| false);
        s.push('\n');
    }
    s.push_str("Next:\n");
    if let Some(shape) = Shape::from_index(engine.next_piece().shape_index) {
        draw_shape(s, &shape);
    }
}

fn draw_row(s: &mut String, grid: &Grid, r: usize, active: impl Fn(usize) -> bool) {
    if r >= grid.rows() {
        s.push_str(&" ".repeat(grid.cols()));
        return;
    }
    for (c, cell) in grid.row(r).iter().enumerate() {
        s.push(if active(c) { '@' } else { cell_char(cell) });
    }
}

fn draw_shape(s: &mut String, shape: &Shape) {
    for r in 0..shape.height() {
        for c in 0..shape.width() {
            s.push(if shape.get(r, c) { '@' } else { ' ' });
        }
        s.push('\n');
    }
}

fn draw_game_over(s: &mut String, view: &FrameView<'_>) {
    let _ = writeln!(s, "GAME OVER  final score {}", view.engine.score());
    let Some(flow) = view.engine.post_game() else {
        return;
    };
    match flow.stage() {
        GameOverStage::EnteringInitials => {
            let _ = writeln!(s, "New high score! Enter initials: {}", flow.initials());
            let _ = writeln!(s, "{}^", " ".repeat(32 + flow.cursor()));
        }
        GameOverStage::AwaitingLeaderboard => s.push_str("Rotate to view the leaderboard\n"),
        GameOverStage::ShowingLeaderboard => {
            s.push_str("High Scores\n");
            for (i, e) in view.leaderboard.iter().enumerate() {
                let _ = writeln!(s, "{}. {} - {}  {}", i + 1, e.initials, e.score, e.date);
            }
        }
    }
}
