use std::fmt;

use chrono::Utc;
use serde::Serialize;

use crate::capture::SlotReader;
use crate::models::{GameSession, Mode, Move, RoundRecord, Scores};

use super::events::GameEvent;
use super::history::HistoryLog;
use super::picker::MovePicker;
use super::resolver::resolve;
use super::window::{CaptureOutcome, CaptureWindow, FreshnessPolicy, WindowStep};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum RoundPhase {
    #[default]
    Idle,
    AwaitingGesture,
    Resolving,
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameRules {
    pub win_threshold: u32,
    pub countdown_secs: u32,
    pub freshness: FreshnessPolicy,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            win_threshold: 5,
            countdown_secs: 3,
            freshness: FreshnessPolicy::Any,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    InvalidStateTransition {
        operation: &'static str,
        phase: RoundPhase,
        mode: Mode,
    },
    CameraUnavailable(String),
    /// The control loop has shut down.
    Closed,
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameError::InvalidStateTransition {
                operation,
                phase,
                mode,
            } => write!(
                f,
                "{operation} not allowed while {phase:?} in {} mode",
                mode.as_str()
            ),
            GameError::CameraUnavailable(reason) => write!(f, "camera unavailable: {reason}"),
            GameError::Closed => f.write_str("game is no longer running"),
        }
    }
}

impl std::error::Error for GameError {}

/// Per-mode state. Only a gesture session can hold a capture window, so
/// "awaiting a gesture in button mode" cannot be expressed.
#[derive(Debug)]
pub enum ModeSession {
    Button,
    Gesture(GestureSession),
}

#[derive(Debug, Default)]
pub struct GestureSession {
    window: Option<CaptureWindow>,
}

impl ModeSession {
    fn for_mode(mode: Mode) -> Self {
        match mode {
            Mode::Button => ModeSession::Button,
            Mode::Gesture => ModeSession::Gesture(GestureSession::default()),
        }
    }

    pub fn mode(&self) -> Mode {
        match self {
            ModeSession::Button => Mode::Button,
            ModeSession::Gesture(_) => Mode::Gesture,
        }
    }

    fn window_open(&self) -> bool {
        matches!(self, ModeSession::Gesture(GestureSession { window: Some(_) }))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub session: GameSession,
    pub mode: Mode,
    pub phase: RoundPhase,
    pub history: Vec<RoundRecord>,
}

/// The round state machine. Synchronous and single-owner: the control loop
/// drives it, nothing else touches it.
pub struct Game {
    session: GameSession,
    history: HistoryLog,
    mode: ModeSession,
    phase: RoundPhase,
    rules: GameRules,
    picker: Box<dyn MovePicker>,
}

impl Game {
    pub fn new(rules: GameRules, mode: Mode, picker: Box<dyn MovePicker>) -> Self {
        Self {
            session: GameSession::new(),
            history: HistoryLog::new(),
            mode: ModeSession::for_mode(mode),
            phase: RoundPhase::Idle,
            rules,
            picker,
        }
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn mode(&self) -> Mode {
        self.mode.mode()
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn is_awaiting_gesture(&self) -> bool {
        self.mode.window_open()
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            session: self.session.clone(),
            mode: self.mode(),
            phase: self.phase,
            history: self.history.to_vec(),
        }
    }

    fn reject(&self, operation: &'static str) -> GameError {
        GameError::InvalidStateTransition {
            operation,
            phase: self.phase,
            mode: self.mode(),
        }
    }

    /// Button-mode play: the player's move is known, resolve right away.
    pub fn submit_move(&mut self, player: Move) -> Result<Vec<GameEvent>, GameError> {
        match self.mode {
            ModeSession::Button if self.phase == RoundPhase::Idle && self.session.active => {
                Ok(self.resolve_round(player))
            }
            _ => Err(self.reject("submit_move")),
        }
    }

    /// Open the countdown window. `capture_running` is whether a capture loop is
    /// publishing into the slot right now.
    pub fn start_gesture_round(&mut self, capture_running: bool) -> Result<(), GameError> {
        if self.phase != RoundPhase::Idle || !self.session.active || !capture_running {
            return Err(self.reject("start_gesture_round"));
        }
        let rules = self.rules;
        if let ModeSession::Gesture(gesture) = &mut self.mode {
            gesture.window = Some(CaptureWindow::open(rules.countdown_secs, rules.freshness));
            self.phase = RoundPhase::AwaitingGesture;
            return Ok(());
        }
        Err(self.reject("start_gesture_round"))
    }

    /// One countdown tick. Returns the events it produced; the expiry tick reads
    /// the slot once and settles the round.
    pub fn advance_window(&mut self, slot: &SlotReader) -> Vec<GameEvent> {
        let ModeSession::Gesture(gesture) = &mut self.mode else {
            return Vec::new();
        };
        let Some(window) = gesture.window.as_mut() else {
            return Vec::new();
        };

        match window.advance(slot) {
            WindowStep::Tick(remaining) => vec![GameEvent::CountdownTick { remaining }],
            WindowStep::Expired(outcome) => {
                gesture.window = None;
                self.complete_capture(outcome)
            }
            WindowStep::Closed => {
                gesture.window = None;
                Vec::new()
            }
        }
    }

    fn complete_capture(&mut self, outcome: CaptureOutcome) -> Vec<GameEvent> {
        match outcome {
            CaptureOutcome::Captured(player) => self.resolve_round(player),
            CaptureOutcome::Missed(reason) => {
                self.phase = RoundPhase::Idle;
                vec![GameEvent::CaptureMissed {
                    round_number: self.session.round_number,
                    reason,
                }]
            }
        }
    }

    fn resolve_round(&mut self, player: Move) -> Vec<GameEvent> {
        self.phase = RoundPhase::Resolving;

        let computer = self.picker.pick();
        let outcome = resolve(player, computer);
        let record = RoundRecord {
            round_number: self.session.round_number,
            mode: self.mode(),
            player_move: player,
            computer_move: computer,
            outcome,
            timestamp: Utc::now(),
        };

        let winner = self.session.apply(outcome, self.rules.win_threshold);
        self.history.push(record.clone());

        let scores = self.session.scores();
        let mut events = vec![GameEvent::RoundResolved { record, scores }];
        match winner {
            Some(winner) => {
                self.phase = RoundPhase::GameOver;
                events.push(GameEvent::GameOver { winner, scores });
            }
            None => self.phase = RoundPhase::Idle,
        }
        events
    }

    /// Checked before the controller touches the capture loop for a switch.
    pub fn can_switch_mode(&self) -> Result<(), GameError> {
        if self.phase == RoundPhase::Idle {
            Ok(())
        } else {
            Err(self.reject("switch_mode"))
        }
    }

    pub fn switch_mode(&mut self, mode: Mode) -> Result<Vec<GameEvent>, GameError> {
        self.can_switch_mode()?;
        if self.mode() == mode {
            return Ok(Vec::new());
        }
        self.mode = ModeSession::for_mode(mode);
        Ok(vec![GameEvent::ModeChanged { mode }])
    }

    /// The capture loop died under us: abandon any countdown and fall back to
    /// button mode regardless of phase.
    pub fn fall_back_to_button(&mut self, reason: String) -> Vec<GameEvent> {
        let mut events = vec![GameEvent::CameraUnavailable { reason }];
        if self.mode() == Mode::Gesture {
            self.mode = ModeSession::Button;
            events.push(GameEvent::ModeChanged { mode: Mode::Button });
        }
        if self.phase == RoundPhase::AwaitingGesture {
            self.phase = RoundPhase::Idle;
        }
        events
    }

    /// New session, empty history, same mode. Any open window is dropped.
    pub fn reset(&mut self) -> Vec<GameEvent> {
        self.session = GameSession::new();
        self.history.clear();
        self.phase = RoundPhase::Idle;
        if let ModeSession::Gesture(gesture) = &mut self.mode {
            gesture.window = None;
        }
        vec![GameEvent::Reset {
            session_id: self.session.id.clone(),
        }]
    }

    pub fn scores(&self) -> Scores {
        self.session.scores()
    }
}
