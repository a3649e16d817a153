pub mod commands;
pub mod controller;
pub mod events;
pub mod history;
pub mod picker;
pub mod resolver;
pub mod state;
pub mod window;

pub use commands::GameHandle;
pub use controller::GameController;
pub use events::GameEvent;
pub use history::HistoryLog;
pub use picker::{MovePicker, RandomPicker, ScriptedPicker};
pub use resolver::resolve;
pub use state::{Game, GameError, GameRules, GameSnapshot, ModeSession, RoundPhase};
pub use window::{CaptureOutcome, CaptureWindow, FreshnessPolicy, MissReason, WindowStep};
