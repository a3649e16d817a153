use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw recogniser codes for the three playable hand shapes. Everything else the
/// recogniser knows about (open hand, fist, pointer, OK, -1 for "nothing") is
/// not a move.
pub const CODE_PAPER: i32 = 4;
pub const CODE_ROCK: i32 = 5;
pub const CODE_SCISSORS: i32 = 6;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Move {
    Rock,
    Paper,
    Scissors,
}

impl Move {
    pub const ALL: [Move; 3] = [Move::Rock, Move::Paper, Move::Scissors];

    /// The move this one defeats.
    pub fn beats(self) -> Move {
        match self {
            Move::Rock => Move::Scissors,
            Move::Scissors => Move::Paper,
            Move::Paper => Move::Rock,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Move::Rock => "Rock",
            Move::Paper => "Paper",
            Move::Scissors => "Scissors",
        }
    }

    pub fn parse(value: &str) -> Option<Move> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rock" | "r" => Some(Move::Rock),
            "paper" | "p" => Some(Move::Paper),
            "scissors" | "s" => Some(Move::Scissors),
            _ => None,
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    PlayerWin,
    ComputerWin,
    Tie,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::PlayerWin => "Player wins",
            Outcome::ComputerWin => "Computer wins",
            Outcome::Tie => "Tie",
        }
    }
}

/// What the recogniser saw in a single frame, constrained to the playable set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum Classification {
    Gesture(Move),
    #[default]
    NoGesture,
}

impl Classification {
    /// Map a raw recogniser code into the constrained set. Unknown codes are
    /// `NoGesture`.
    pub fn from_code(code: i32) -> Self {
        match code {
            CODE_ROCK => Classification::Gesture(Move::Rock),
            CODE_PAPER => Classification::Gesture(Move::Paper),
            CODE_SCISSORS => Classification::Gesture(Move::Scissors),
            _ => Classification::NoGesture,
        }
    }

    pub fn as_move(&self) -> Option<Move> {
        match self {
            Classification::Gesture(mv) => Some(*mv),
            Classification::NoGesture => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum Mode {
    #[default]
    Button,
    Gesture,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Button => "button",
            Mode::Gesture => "gesture",
        }
    }
}
