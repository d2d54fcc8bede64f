use std::time::Duration;

use rand::rngs::SmallRng;
use rand::Rng;

use super::{Input, InputSource};
use crate::sim::Action;

/// Bot that presses a random control at a fixed cadence.
///
/// Moves dominate; hard drops and sabotage attempts are rarer so pieces still
/// get spread across the grid.
pub struct AutoInput {
    rng: SmallRng,
    period: Duration,
    remaining: Option<u64>,
}

impl AutoInput {
    pub fn new(rng: SmallRng, period: Duration) -> Self {
        Self {
            rng,
            period,
            remaining: None,
        }
    }

    /// Stop after `count` inputs.
    pub fn limited(mut self, count: u64) -> Self {
        self.remaining = Some(count);
        self
    }

    fn pick(&mut self) -> Action {
        match self.rng.random_range(0..100) {
            0..=29 => Action::MoveLeft,
            30..=59 => Action::MoveRight,
            60..=79 => Action::Rotate,
            80..=94 => Action::HardDrop,
            _ => Action::Sabotage,
        }
    }
}

#[async_trait::async_trait]
impl InputSource for AutoInput {
    async fn next_input(&mut self) -> Option<Input> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return None;
            }
            *remaining -= 1;
        }
        tokio::time::sleep(self.period).await;
        Some(Input::Action(self.pick()))
    }
}
