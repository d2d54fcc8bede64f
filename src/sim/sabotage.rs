//! Sabotage meter and the timed effects a sabotage applies.

use alloc::vec::Vec;

use rand::seq::SliceRandom;
use rand::Rng;

use super::config::SabotageConfig;
use super::events::Action;

/// The three sabotage effects, indexed as on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SabotageKind {
    /// Replace the receiver's active piece with a random one.
    Reroll,
    /// Temporarily shorten the receiver's gravity cadence.
    SpeedUp,
    /// Temporarily permute the receiver's movement controls.
    Scramble,
}

impl SabotageKind {
    pub const ALL: [SabotageKind; 3] = [
        SabotageKind::Reroll,
        SabotageKind::SpeedUp,
        SabotageKind::Scramble,
    ];

    /// Map a wire index (0–2) to a kind.
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn index(&self) -> u8 {
        match self {
            SabotageKind::Reroll => 0,
            SabotageKind::SpeedUp => 1,
            SabotageKind::Scramble => 2,
        }
    }
}

/// Charge accumulated towards the next sabotage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SabotageMeter {
    value: u32,
    max: u32,
    rate: u32,
    thresholds: [u32; 3],
    available: Vec<SabotageKind>,
}

impl SabotageMeter {
    pub fn new(config: &SabotageConfig) -> Self {
        Self {
            value: 0,
            max: config.max,
            rate: config.rate,
            thresholds: config.thresholds,
            available: Vec::new(),
        }
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn thresholds(&self) -> [u32; 3] {
        self.thresholds
    }

    /// Fill level in `[0.0, 1.0]`.
    pub fn fill(&self) -> f32 {
        if self.max == 0 {
            0.0
        } else {
            self.value as f32 / self.max as f32
        }
    }

    /// Sabotages whose threshold has been reached, lowest first.
    pub fn available(&self) -> &[SabotageKind] {
        &self.available
    }

    /// Advance one tick: add the rate, saturating at max.
    pub fn tick(&mut self) {
        self.value = self.value.saturating_add(self.rate).min(self.max);
        self.refresh();
    }

    /// Force the meter to `value` (clamped), mainly for tests and tooling.
    pub fn set_value(&mut self, value: u32) {
        self.value = value.min(self.max);
        self.refresh();
    }

    fn refresh(&mut self) {
        self.available = SabotageKind::ALL
            .iter()
            .zip(self.thresholds.iter())
            .filter(|(_, &t)| self.value >= t)
            .map(|(k, _)| *k)
            .collect();
    }

    /// Spend the charge on the strongest unlocked sabotage.
    ///
    /// Returns `None` and leaves the meter untouched when nothing is unlocked.
    pub fn trigger(&mut self) -> Option<SabotageKind> {
        let kind = self.available.last().copied()?;
        self.value = 0;
        self.available.clear();
        Some(kind)
    }
}

/// Mapping from physical movement tags to the effect they currently produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlMapping {
    targets: [Action; 4],
}

impl Default for ControlMapping {
    fn default() -> Self {
        Self::identity()
    }
}

impl ControlMapping {
    pub fn identity() -> Self {
        Self {
            targets: Action::MOVEMENT,
        }
    }

    /// A uniformly random permutation of the movement effects.
    pub fn shuffled<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut targets = Action::MOVEMENT;
        targets.shuffle(rng);
        Self { targets }
    }

    pub fn is_identity(&self) -> bool {
        self.targets == Action::MOVEMENT
    }

    /// Effect produced by pressing `action`. `Sabotage` is never remapped.
    pub fn resolve(&self, action: Action) -> Action {
        Action::MOVEMENT
            .iter()
            .position(|a| *a == action)
            .map_or(action, |i| self.targets[i])
    }

    /// `(physical, effective)` pairs in mapping order.
    pub fn pairs(&self) -> impl Iterator<Item = (Action, Action)> + '_ {
        Action::MOVEMENT.iter().copied().zip(self.targets.iter().copied())
    }
}

/// Timers for the effects currently in force on the local player.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SabotageEffects {
    speedup_remaining: u32,
    base_frames_per_move: Option<u32>,
    scramble_remaining: u32,
    mapping: ControlMapping,
}

impl SabotageEffects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mapping(&self) -> &ControlMapping {
        &self.mapping
    }

    pub fn speedup_remaining(&self) -> u32 {
        self.speedup_remaining
    }

    pub fn scramble_remaining(&self) -> u32 {
        self.scramble_remaining
    }

    /// Shorten the cadence and (re)start the speed-up timer.
    ///
    /// The cadence in force before the first stacked speed-up is the one
    /// restored on expiry.
    pub fn speed_up(&mut self, frames_per_move: &mut u32, config: &SabotageConfig) {
        if self.base_frames_per_move.is_none() {
            self.base_frames_per_move = Some(*frames_per_move);
        }
        *frames_per_move = frames_per_move.saturating_sub(config.speedup_delta).max(1);
        self.speedup_remaining = config.speedup_duration;
    }

    /// Permute the movement controls and (re)start the scramble timer.
    pub fn scramble<R: Rng + ?Sized>(&mut self, rng: &mut R, config: &SabotageConfig) {
        self.mapping = ControlMapping::shuffled(rng);
        self.scramble_remaining = config.scramble_duration;
    }

    /// Count both timers down by one tick, undoing any effect that expires.
    pub fn tick(&mut self, frames_per_move: &mut u32) {
        if self.speedup_remaining > 0 {
            self.speedup_remaining -= 1;
            if self.speedup_remaining == 0 {
                if let Some(base) = self.base_frames_per_move.take() {
                    *frames_per_move = base;
                }
            }
        }
        if self.scramble_remaining > 0 {
            self.scramble_remaining -= 1;
            if self.scramble_remaining == 0 {
                self.mapping = ControlMapping::identity();
            }
        }
    }
}
