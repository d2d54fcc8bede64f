#![cfg(feature = "std")]

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::sim::HIGH_SCORE_SLOTS;

/// Default leaderboard file, relative to the working directory.
pub const DEFAULT_SCORES_FILE: &str = "highscores.json";

/// One leaderboard line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    /// Local time of the entry, `%Y-%m-%d %H:%M`.
    pub date: String,
    pub score: u64,
    pub initials: String,
}

impl HighScoreEntry {
    /// Entry stamped with the current local time.
    pub fn now(score: u64, initials: impl Into<String>) -> Self {
        Self {
            date: chrono::Local::now().format("%Y-%m-%d %H:%M").to_string(),
            score,
            initials: initials.into(),
        }
    }
}

#[derive(Debug)]
pub enum StoreError {
    Io(io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "high-score file: {}", e),
            StoreError::Json(e) => write!(f, "high-score encoding: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        StoreError::Io(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Json(e)
    }
}

/// Ordered top-N persistence for the leaderboard.
pub trait HighScoreStore: Send {
    /// Best `n` entries, highest score first. Unreadable storage reads as empty.
    fn load_top(&self, n: usize) -> Vec<HighScoreEntry>;

    /// Replace the stored leaderboard with the best `n` of `entries`.
    fn save_top(&mut self, n: usize, entries: &[HighScoreEntry]) -> Result<(), StoreError>;
}

/// Whether `score` earns a place on a board currently holding `entries`.
pub fn qualifies(entries: &[HighScoreEntry], score: u64) -> bool {
    entries.len() < HIGH_SCORE_SLOTS || entries.iter().map(|e| e.score).min().is_some_and(|min| score > min)
}

/// Sort by score descending and keep the first `n`.
pub fn top_n(mut entries: Vec<HighScoreEntry>, n: usize) -> Vec<HighScoreEntry> {
    entries.sort_by(|a, b| b.score.cmp(&a.score));
    entries.truncate(n);
    entries
}

/// Add `entry` to the store, keeping the best [`HIGH_SCORE_SLOTS`].
pub fn record(store: &mut dyn HighScoreStore, entry: HighScoreEntry) -> Result<Vec<HighScoreEntry>, StoreError> {
    let mut entries = store.load_top(HIGH_SCORE_SLOTS);
    entries.push(entry);
    let entries = top_n(entries, HIGH_SCORE_SLOTS);
    store.save_top(HIGH_SCORE_SLOTS, &entries)?;
    Ok(entries)
}

/// Leaderboard persisted as a pretty-printed JSON array.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HighScoreStore for JsonFileStore {
    fn load_top(&self, n: usize) -> Vec<HighScoreEntry> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) => {
                debug!("no high scores at {}: {}", self.path.display(), e);
                return Vec::new();
            }
        };
        match serde_json::from_str::<Vec<HighScoreEntry>>(&text) {
            Ok(entries) => top_n(entries, n),
            Err(e) => {
                warn!("ignoring unreadable {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }

    fn save_top(&mut self, n: usize, entries: &[HighScoreEntry]) -> Result<(), StoreError> {
        let entries = top_n(entries.to_vec(), n);
        let text = serde_json::to_string_pretty(&entries)?;
        fs::write(&self.path, text)?;
        Ok(())
    }
}

/// In-process leaderboard.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Vec<HighScoreEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Vec<HighScoreEntry>) -> Self {
        Self { entries }
    }
}

impl HighScoreStore for MemoryStore {
    fn load_top(&self, n: usize) -> Vec<HighScoreEntry> {
        top_n(self.entries.clone(), n)
    }

    fn save_top(&mut self, n: usize, entries: &[HighScoreEntry]) -> Result<(), StoreError> {
        self.entries = top_n(entries.to_vec(), n);
        Ok(())
    }
}
