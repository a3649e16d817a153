use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Mode, Move, Outcome};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Winner {
    Player,
    Computer,
}

impl Winner {
    pub fn as_str(&self) -> &'static str {
        match self {
            Winner::Player => "Player",
            Winner::Computer => "Computer",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Scores {
    pub player: u32,
    pub computer: u32,
}

/// One resolved round. Only created when a round actually resolved; a missed
/// gesture capture never produces one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoundRecord {
    pub round_number: u32,
    pub mode: Mode,
    pub player_move: Move,
    pub computer_move: Move,
    pub outcome: Outcome,
    pub timestamp: DateTime<Utc>,
}

impl RoundRecord {
    pub fn summary(&self) -> String {
        format!(
            "Round {}: {} vs {} -> {}",
            self.round_number,
            self.player_move,
            self.computer_move,
            self.outcome.as_str()
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSession {
    pub id: String,
    pub player_score: u32,
    pub computer_score: u32,
    pub round_number: u32,
    pub active: bool,
    pub started_at: DateTime<Utc>,
}

impl Default for GameSession {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            player_score: 0,
            computer_score: 0,
            round_number: 1,
            active: true,
            started_at: Utc::now(),
        }
    }
}

impl GameSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scores(&self) -> Scores {
        Scores {
            player: self.player_score,
            computer: self.computer_score,
        }
    }

    /// Apply a resolved outcome. Returns the winner if this update is the one
    /// that first reaches `win_threshold`.
    pub fn apply(&mut self, outcome: Outcome, win_threshold: u32) -> Option<Winner> {
        match outcome {
            Outcome::PlayerWin => self.player_score += 1,
            Outcome::ComputerWin => self.computer_score += 1,
            Outcome::Tie => {}
        }
        self.round_number += 1;

        if !self.active {
            return None;
        }
        let winner = if self.player_score >= win_threshold {
            Some(Winner::Player)
        } else if self.computer_score >= win_threshold {
            Some(Winner::Computer)
        } else {
            None
        };
        if winner.is_some() {
            self.active = false;
        }
        winner
    }
}
