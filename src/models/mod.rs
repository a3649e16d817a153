mod moves;
mod session;

pub use moves::{Classification, Mode, Move, Outcome, CODE_PAPER, CODE_ROCK, CODE_SCISSORS};
pub use session::{GameSession, RoundRecord, Scores, Winner};
