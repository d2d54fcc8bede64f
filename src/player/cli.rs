use std::collections::VecDeque;

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use super::{Input, InputSource};
use crate::sim::Action;

/// Keyboard input read line by line from stdin.
///
/// Each character of a line is one key: `a`/`d` move, `w` rotates, `s` hard
/// drops, `x` or `1` sabotages, `q` quits. An empty line confirms.
pub struct CliInput {
    lines: Lines<BufReader<Stdin>>,
    pending: VecDeque<Input>,
}

impl CliInput {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            pending: VecDeque::new(),
        }
    }
}

impl Default for CliInput {
    fn default() -> Self {
        Self::new()
    }
}

/// Translate one typed line into inputs, skipping unknown keys.
pub fn parse_line(line: &str) -> Vec<Input> {
    let line = line.trim();
    if line.is_empty() {
        return vec![Input::Confirm];
    }
    line.chars()
        .filter_map(|ch| match ch.to_ascii_lowercase() {
            'a' => Some(Input::Action(Action::MoveLeft)),
            'd' => Some(Input::Action(Action::MoveRight)),
            'w' => Some(Input::Action(Action::Rotate)),
            's' => Some(Input::Action(Action::HardDrop)),
            'x' | '1' => Some(Input::Action(Action::Sabotage)),
            'q' => Some(Input::Quit),
            _ => None,
        })
        .collect()
}

#[async_trait::async_trait]
impl InputSource for CliInput {
    async fn next_input(&mut self) -> Option<Input> {
        loop {
            if let Some(input) = self.pending.pop_front() {
                return Some(input);
            }
            match self.lines.next_line().await {
                Ok(Some(line)) => self.pending.extend(parse_line(&line)),
                Ok(None) | Err(_) => return Some(Input::Quit),
            }
        }
    }
}
