//! Input sources feeding the peer node
//!
//! - AutoInput: random bot used by the simulation binary and `--player ai`
//! - CliInput: line-based keyboard input from stdin

use log::debug;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::sim::Action;

/// One event from an input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    /// In-game control tag.
    Action(Action),
    /// Start matchmaking, retry, or start the game, depending on the phase.
    Confirm,
    Quit,
}

/// Producer of abstract input events.
#[async_trait::async_trait]
pub trait InputSource: Send {
    /// Wait for the next input. `None` means the source is exhausted.
    async fn next_input(&mut self) -> Option<Input>;
}

/// Forward `source` into the node's bounded input channel on a background
/// task. Inputs arriving while the channel is full are dropped.
pub fn spawn_input(mut source: Box<dyn InputSource>, tx: mpsc::Sender<Input>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(input) = source.next_input().await {
            match tx.try_send(input) {
                Ok(()) => {}
                Err(TrySendError::Full(dropped)) => debug!("input channel full, dropping {:?}", dropped),
                Err(TrySendError::Closed(_)) => break,
            }
        }
    })
}

pub mod ai;
pub use ai::AutoInput;

pub mod cli;
pub use cli::CliInput;
