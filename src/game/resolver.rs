use crate::models::{Move, Outcome};

/// Decide a round from the player's point of view.
pub fn resolve(player: Move, computer: Move) -> Outcome {
    if player == computer {
        Outcome::Tie
    } else if player.beats() == computer {
        Outcome::PlayerWin
    } else {
        Outcome::ComputerWin
    }
}
