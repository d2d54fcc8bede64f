//! Post-game flow: initials entry, result screen and leaderboard.

use alloc::string::String;

use super::events::Action;

const ALPHABET: &[u8; 26] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const INITIALS_LEN: usize = 3;

/// Which post-game screen is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOverStage {
    /// Score qualified; the player is choosing three letters.
    EnteringInitials,
    /// Final score shown, waiting for the player to open the leaderboard.
    AwaitingLeaderboard,
    ShowingLeaderboard,
}

/// Something the caller must act upon after an input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameOverEvent {
    /// The third letter was confirmed; persist the entry.
    InitialsEntered(String),
    /// Leaderboard dismissed; return to the start screen.
    RestartRequested,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameOverFlow {
    stage: GameOverStage,
    letters: [u8; INITIALS_LEN],
    cursor: usize,
}

impl GameOverFlow {
    /// Start the flow, beginning with initials entry when `qualifies`.
    pub fn new(qualifies: bool) -> Self {
        Self {
            stage: if qualifies {
                GameOverStage::EnteringInitials
            } else {
                GameOverStage::AwaitingLeaderboard
            },
            letters: [0; INITIALS_LEN],
            cursor: 0,
        }
    }

    pub fn stage(&self) -> GameOverStage {
        self.stage
    }

    /// Letter position currently being edited.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn initials(&self) -> String {
        self.letters
            .iter()
            .map(|&i| ALPHABET[i as usize] as char)
            .collect()
    }

    /// Feed one input.
    ///
    /// While entering initials, left/right cycle the current letter and rotate
    /// confirms it. Afterwards rotate opens the leaderboard and, once shown,
    /// requests a restart. Everything else is ignored.
    pub fn handle(&mut self, action: Action) -> Option<GameOverEvent> {
        match (self.stage, action) {
            (GameOverStage::EnteringInitials, Action::MoveLeft) => {
                let l = &mut self.letters[self.cursor];
                *l = (*l + ALPHABET.len() as u8 - 1) % ALPHABET.len() as u8;
                None
            }
            (GameOverStage::EnteringInitials, Action::MoveRight) => {
                let l = &mut self.letters[self.cursor];
                *l = (*l + 1) % ALPHABET.len() as u8;
                None
            }
            (GameOverStage::EnteringInitials, Action::Rotate) => {
                if self.cursor + 1 < INITIALS_LEN {
                    self.cursor += 1;
                    None
                } else {
                    self.stage = GameOverStage::AwaitingLeaderboard;
                    Some(GameOverEvent::InitialsEntered(self.initials()))
                }
            }
            (GameOverStage::AwaitingLeaderboard, Action::Rotate) => {
                self.stage = GameOverStage::ShowingLeaderboard;
                None
            }
            (GameOverStage::ShowingLeaderboard, Action::Rotate) => {
                Some(GameOverEvent::RestartRequested)
            }
            _ => None,
        }
    }
}
