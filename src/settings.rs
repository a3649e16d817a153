use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::Arc, sync::RwLock, time::Duration};

use crate::capture::{CaptureController, FileInput, GestureInput};
use crate::game::{FreshnessPolicy, GameRules};
use crate::models::Mode;

pub const SETTINGS_ENV: &str = "RPS_GESTURE_SETTINGS";
const DEFAULT_SETTINGS_FILE: &str = "rps-gesture.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GameSettings {
    pub countdown_secs: u32,
    pub win_threshold: u32,
    pub mirror: bool,
    pub frame_delay_ms: u64,
    pub file_poll_ms: u64,
    pub stop_timeout_ms: u64,
    pub freshness: FreshnessPolicy,
    /// Text file holding the current recogniser code, written by an external
    /// recogniser process.
    pub gesture_file: Option<PathBuf>,
    pub start_mode: Mode,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            countdown_secs: 3,
            win_threshold: 5,
            mirror: true,
            frame_delay_ms: 10,
            file_poll_ms: 200,
            stop_timeout_ms: 1000,
            freshness: FreshnessPolicy::Any,
            gesture_file: None,
            start_mode: Mode::Button,
        }
    }
}

impl GameSettings {
    pub fn rules(&self) -> GameRules {
        GameRules {
            win_threshold: self.win_threshold.max(1),
            countdown_secs: self.countdown_secs,
            freshness: self.freshness,
        }
    }

    pub fn capture_controller(&self) -> CaptureController {
        CaptureController::new(Duration::from_millis(self.stop_timeout_ms))
    }

    /// The gesture producer this configuration describes, if any.
    pub fn gesture_input(&self) -> Option<Arc<dyn GestureInput>> {
        self.gesture_file.as_ref().map(|path| {
            Arc::new(FileInput::new(
                path.clone(),
                Duration::from_millis(self.file_poll_ms),
            )) as Arc<dyn GestureInput>
        })
    }
}

pub fn default_settings_path() -> PathBuf {
    std::env::var_os(SETTINGS_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE))
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<GameSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!("ignoring unreadable settings {}: {err}", path.display());
                GameSettings::default()
            })
        } else {
            GameSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn settings(&self) -> GameSettings {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn update(&self, settings: GameSettings) -> Result<()> {
        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &GameSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
