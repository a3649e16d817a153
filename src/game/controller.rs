use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Interval, MissedTickBehavior};

use crate::capture::{CaptureController, CaptureError, GestureInput, LoopExit, SlotReader};
use crate::models::Mode;

use super::commands::{GameCommand, GameHandle, GameRequest};
use super::events::GameEvent;
use super::state::{Game, GameError};

const COMMAND_BUFFER: usize = 32;

/// The control loop. Owns the game, the countdown timer and the capture
/// controller; everything observable changes here and only here.
pub struct GameController {
    game: Game,
    capture: CaptureController,
    input: Option<Arc<dyn GestureInput>>,
    slot: Option<SlotReader>,
    countdown: Option<Interval>,
    tick_interval: Duration,
    commands: mpsc::Receiver<GameCommand>,
    events: mpsc::UnboundedSender<GameEvent>,
}

async fn next_tick(countdown: &mut Option<Interval>) {
    match countdown {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

impl GameController {
    pub fn new(
        game: Game,
        capture: CaptureController,
        input: Option<Arc<dyn GestureInput>>,
    ) -> (Self, GameHandle, mpsc::UnboundedReceiver<GameEvent>) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let controller = Self {
            game,
            capture,
            input,
            slot: None,
            countdown: None,
            tick_interval: Duration::from_secs(1),
            commands: command_rx,
            events: event_tx,
        };

        (controller, GameHandle::new(command_tx), event_rx)
    }

    /// Countdown tick period. One second unless a caller needs it faster.
    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        info!(
            "game {} starting in {} mode",
            self.game.session().id,
            self.game.mode().as_str()
        );

        if self.game.mode() == Mode::Gesture {
            if let Err(err) = self.start_capture().await {
                warn!("gesture mode unavailable at startup: {err}");
                let events = self.game.fall_back_to_button(err.to_string());
                self.emit_all(events);
            }
        }

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(GameCommand::Shutdown { reply }) => {
                        self.shutdown().await;
                        let _ = reply.send(());
                        break;
                    }
                    Some(GameCommand::Request(request)) => self.handle(request).await,
                    None => {
                        self.shutdown().await;
                        break;
                    }
                },
                _ = next_tick(&mut self.countdown), if self.countdown.is_some() => {
                    self.on_tick();
                }
                exit = self.capture.exited(), if self.capture.is_running() => {
                    self.on_capture_exit(exit);
                }
            }
        }

        info!("game {} stopped", self.game.session().id);
    }

    async fn handle(&mut self, request: GameRequest) {
        match request {
            GameRequest::SubmitMove { player, reply } => {
                let result = self.game.submit_move(player).map(|events| self.emit_all(events));
                log_rejection(&result);
                let _ = reply.send(result);
            }
            GameRequest::StartGestureRound { reply } => {
                let result = self.start_gesture_round();
                log_rejection(&result);
                let _ = reply.send(result);
            }
            GameRequest::SwitchMode { mode, reply } => {
                let result = self.switch_mode(mode).await;
                log_rejection(&result);
                let _ = reply.send(result);
            }
            GameRequest::Reset { reply } => {
                self.countdown = None;
                let events = self.game.reset();
                info!("game reset, new session {}", self.game.session().id);
                self.emit_all(events);
                let _ = reply.send(());
            }
            GameRequest::Snapshot { reply } => {
                let _ = reply.send(self.game.snapshot());
            }
        }
    }

    fn start_gesture_round(&mut self) -> Result<(), GameError> {
        let capture_live = self.capture.is_running() && self.slot.is_some();
        self.game.start_gesture_round(capture_live)?;

        let mut interval = time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.countdown = Some(interval);
        debug!("capture window opened for round {}", self.game.session().round_number);
        Ok(())
    }

    fn on_tick(&mut self) {
        let Some(slot) = self.slot.as_ref() else {
            self.countdown = None;
            return;
        };
        let events = self.game.advance_window(slot);
        if !self.game.is_awaiting_gesture() {
            self.countdown = None;
        }
        self.emit_all(events);
    }

    async fn switch_mode(&mut self, mode: Mode) -> Result<(), GameError> {
        self.game.can_switch_mode()?;
        if self.game.mode() == mode {
            return Ok(());
        }

        match mode {
            Mode::Button => {
                self.countdown = None;
                self.slot = None;
                if let Err(err) = self.capture.stop().await {
                    // The loop still owns the camera; the next start waits for it.
                    warn!("leaving gesture mode: {err}");
                }
            }
            Mode::Gesture => {
                if let Err(err) = self.start_capture().await {
                    let reason = err.to_string();
                    self.emit(GameEvent::CameraUnavailable {
                        reason: reason.clone(),
                    });
                    return Err(GameError::CameraUnavailable(reason));
                }
            }
        }

        let events = self.game.switch_mode(mode)?;
        info!("switched to {} mode", mode.as_str());
        self.emit_all(events);
        Ok(())
    }

    async fn start_capture(&mut self) -> Result<(), CaptureError> {
        let input = self
            .input
            .clone()
            .ok_or_else(|| CaptureError::CameraUnavailable("no gesture input configured".into()))?;
        let reader = self.capture.start(input).await?;
        self.slot = Some(reader);
        Ok(())
    }

    fn on_capture_exit(&mut self, exit: LoopExit) {
        self.countdown = None;
        self.slot = None;
        let reason = match exit {
            LoopExit::DeviceLost(reason) => reason,
            LoopExit::Stopped => "capture loop stopped unexpectedly".to_string(),
        };
        warn!("capture loop ended, falling back to button mode: {reason}");
        let events = self.game.fall_back_to_button(reason);
        self.emit_all(events);
    }

    async fn shutdown(&mut self) {
        self.countdown = None;
        self.slot = None;
        if let Err(err) = self.capture.stop().await {
            warn!("shutdown: {err}");
        }
    }

    fn emit(&self, event: GameEvent) {
        let _ = self.events.send(event);
    }

    fn emit_all(&self, events: Vec<GameEvent>) {
        for event in events {
            self.emit(event);
        }
    }
}

fn log_rejection(result: &Result<(), GameError>) {
    if let Err(err) = result {
        debug!("command ignored: {err}");
    }
}
