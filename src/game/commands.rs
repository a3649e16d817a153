use tokio::sync::{mpsc, oneshot};

use crate::models::{Mode, Move};

use super::state::{GameError, GameSnapshot};

/// Everything the control loop answers while it keeps running.
pub enum GameRequest {
    SubmitMove {
        player: Move,
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    StartGestureRound {
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    SwitchMode {
        mode: Mode,
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    Reset {
        reply: oneshot::Sender<()>,
    },
    Snapshot {
        reply: oneshot::Sender<GameSnapshot>,
    },
}

pub enum GameCommand {
    Request(GameRequest),
    /// Ends the control loop; never reaches the request handler.
    Shutdown { reply: oneshot::Sender<()> },
}

/// Cloneable front door to the control loop. UI code holds one of these and
/// never touches game state directly.
#[derive(Clone)]
pub struct GameHandle {
    tx: mpsc::Sender<GameCommand>,
}

impl GameHandle {
    pub(crate) fn new(tx: mpsc::Sender<GameCommand>) -> Self {
        Self { tx }
    }

    async fn send<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> GameCommand,
    ) -> Result<T, GameError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| GameError::Closed)?;
        rx.await.map_err(|_| GameError::Closed)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> GameRequest,
    ) -> Result<T, GameError> {
        self.send(|reply| GameCommand::Request(build(reply))).await
    }

    pub async fn submit_move(&self, player: Move) -> Result<(), GameError> {
        self.request(|reply| GameRequest::SubmitMove { player, reply })
            .await?
    }

    pub async fn start_gesture_round(&self) -> Result<(), GameError> {
        self.request(|reply| GameRequest::StartGestureRound { reply })
            .await?
    }

    pub async fn switch_mode(&self, mode: Mode) -> Result<(), GameError> {
        self.request(|reply| GameRequest::SwitchMode { mode, reply })
            .await?
    }

    pub async fn reset(&self) -> Result<(), GameError> {
        self.request(|reply| GameRequest::Reset { reply }).await
    }

    pub async fn snapshot(&self) -> Result<GameSnapshot, GameError> {
        self.request(|reply| GameRequest::Snapshot { reply }).await
    }

    /// Stop the control loop, waiting for the capture loop to let go of the
    /// camera first.
    pub async fn shutdown(&self) -> Result<(), GameError> {
        self.send(|reply| GameCommand::Shutdown { reply }).await
    }
}
