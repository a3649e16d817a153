use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::models::Move;

/// Where the computer's moves come from.
pub trait MovePicker: Send {
    fn pick(&mut self) -> Move;
}

/// Uniform draw over the three moves.
pub struct RandomPicker {
    rng: StdRng,
}

impl RandomPicker {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomPicker {
    fn default() -> Self {
        Self::new()
    }
}

impl MovePicker for RandomPicker {
    fn pick(&mut self) -> Move {
        *Move::ALL.choose(&mut self.rng).unwrap_or(&Move::Rock)
    }
}

/// Plays a fixed script, then repeats its last move. For replays and tests.
pub struct ScriptedPicker {
    script: VecDeque<Move>,
    last: Move,
}

impl ScriptedPicker {
    pub fn new(moves: impl IntoIterator<Item = Move>) -> Self {
        Self {
            script: moves.into_iter().collect(),
            last: Move::Rock,
        }
    }
}

impl MovePicker for ScriptedPicker {
    fn pick(&mut self) -> Move {
        if let Some(next) = self.script.pop_front() {
            self.last = next;
        }
        self.last
    }
}
