use serde::Serialize;

use crate::models::{Mode, RoundRecord, Scores, Winner};

use super::window::MissReason;

/// Everything the presentation layer gets told. Emitted only by the control
/// loop, in the order things happened.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GameEvent {
    ModeChanged {
        mode: Mode,
    },
    CountdownTick {
        remaining: u32,
    },
    RoundResolved {
        record: RoundRecord,
        scores: Scores,
    },
    CaptureMissed {
        #[serde(rename = "roundNumber")]
        round_number: u32,
        reason: MissReason,
    },
    GameOver {
        winner: Winner,
        scores: Scores,
    },
    CameraUnavailable {
        reason: String,
    },
    Reset {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
}
