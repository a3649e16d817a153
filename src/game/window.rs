use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

use crate::capture::{Observation, SlotReader};
use crate::models::Move;

/// How old the slot's observation may be when the window expires.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum FreshnessPolicy {
    /// Accept whatever the slot holds, however old.
    #[default]
    Any,
    /// Accept only observations at most this many milliseconds old.
    MaxAgeMs(u64),
    /// Accept only observations published after the window opened.
    SinceWindowOpen,
}

impl FreshnessPolicy {
    fn accepts(&self, observation: &Observation, opened_at: Instant, now: Instant) -> bool {
        match self {
            FreshnessPolicy::Any => true,
            FreshnessPolicy::MaxAgeMs(ms) => {
                now.saturating_duration_since(observation.observed_at)
                    <= Duration::from_millis(*ms)
            }
            FreshnessPolicy::SinceWindowOpen => observation.observed_at >= opened_at,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MissReason {
    NoGesture,
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    Captured(Move),
    Missed(MissReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowStep {
    /// Countdown display value, `N` down to 1.
    Tick(u32),
    /// The single expiry step; carries the result of the one slot read.
    Expired(CaptureOutcome),
    /// Already expired; nothing left to do.
    Closed,
}

/// A countdown that takes exactly one snapshot of the gesture slot when it runs
/// out. The caller drives it with one `advance` per second.
#[derive(Debug)]
pub struct CaptureWindow {
    remaining: u32,
    opened_at: Instant,
    freshness: FreshnessPolicy,
    expired: bool,
}

impl CaptureWindow {
    pub fn open(countdown_secs: u32, freshness: FreshnessPolicy) -> Self {
        Self {
            remaining: countdown_secs,
            opened_at: Instant::now(),
            freshness,
            expired: false,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    pub fn advance(&mut self, slot: &SlotReader) -> WindowStep {
        if self.expired {
            return WindowStep::Closed;
        }
        if self.remaining > 0 {
            let shown = self.remaining;
            self.remaining -= 1;
            return WindowStep::Tick(shown);
        }

        self.expired = true;
        let observation = slot.snapshot();
        WindowStep::Expired(self.judge(&observation, Instant::now()))
    }

    fn judge(&self, observation: &Observation, now: Instant) -> CaptureOutcome {
        match observation.classification.as_move() {
            None => CaptureOutcome::Missed(MissReason::NoGesture),
            Some(mv) if self.freshness.accepts(observation, self.opened_at, now) => {
                CaptureOutcome::Captured(mv)
            }
            Some(_) => CaptureOutcome::Missed(MissReason::Stale),
        }
    }
}
