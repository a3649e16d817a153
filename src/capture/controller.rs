use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use serde::Serialize;
use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

use super::loop_worker::{capture_loop, LoopExit};
use super::slot::{gesture_slot, SlotReader};
use super::source::{CaptureError, GestureInput};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum LoopLifecycle {
    Stopped,
    Running,
    StopRequested,
}

enum CaptureState {
    Stopped,
    Running {
        handle: JoinHandle<LoopExit>,
        cancel_token: CancellationToken,
    },
    /// Stop was requested but the loop has not confirmed within the timeout.
    /// The camera still belongs to the loop.
    StopRequested { handle: JoinHandle<LoopExit> },
}

/// Starts and stops the one capture loop. Lives on the control loop; the loop
/// itself runs on the blocking pool.
pub struct CaptureController {
    state: CaptureState,
    stop_timeout: Duration,
}

fn exit_from_join(result: Result<LoopExit, JoinError>) -> LoopExit {
    result.unwrap_or_else(|err| LoopExit::DeviceLost(format!("capture loop crashed: {err}")))
}

impl CaptureController {
    pub fn new(stop_timeout: Duration) -> Self {
        Self {
            state: CaptureState::Stopped,
            stop_timeout,
        }
    }

    pub fn lifecycle(&self) -> LoopLifecycle {
        match self.state {
            CaptureState::Stopped => LoopLifecycle::Stopped,
            CaptureState::Running { .. } => LoopLifecycle::Running,
            CaptureState::StopRequested { .. } => LoopLifecycle::StopRequested,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, CaptureState::Running { .. })
    }

    /// Open the input on a worker thread and start the loop there. Resolves once
    /// the input is open, so a missing camera surfaces here.
    pub async fn start(&mut self, input: Arc<dyn GestureInput>) -> Result<SlotReader, CaptureError> {
        match std::mem::replace(&mut self.state, CaptureState::Stopped) {
            CaptureState::Stopped => {}
            running @ CaptureState::Running { .. } => {
                self.state = running;
                return Err(CaptureError::AlreadyRunning);
            }
            CaptureState::StopRequested { mut handle } => {
                // Give the previous loop one more chance to hand the camera back.
                match tokio::time::timeout(self.stop_timeout, &mut handle).await {
                    Ok(result) => {
                        info!("previous capture loop drained: {:?}", exit_from_join(result));
                    }
                    Err(_) => {
                        self.state = CaptureState::StopRequested { handle };
                        return Err(CaptureError::StillDraining);
                    }
                }
            }
        }

        info!("starting capture from {}", input.describe());

        let cancel_token = CancellationToken::new();
        let token_clone = cancel_token.clone();
        let (writer, reader) = gesture_slot();
        let (ready_tx, ready_rx) = oneshot::channel();

        let handle = tokio::task::spawn_blocking(move || match input.open() {
            Ok(source) => {
                let _ = ready_tx.send(Ok(()));
                capture_loop(source, writer, token_clone)
            }
            Err(err) => {
                let reason = err.to_string();
                let _ = ready_tx.send(Err(err));
                LoopExit::DeviceLost(reason)
            }
        });

        match ready_rx.await {
            Ok(Ok(())) => {
                self.state = CaptureState::Running {
                    handle,
                    cancel_token,
                };
                Ok(reader)
            }
            Ok(Err(err)) => {
                let _ = handle.await;
                Err(err)
            }
            Err(_) => {
                let exit = exit_from_join(handle.await);
                Err(CaptureError::CameraUnavailable(format!(
                    "capture worker exited before opening: {exit:?}"
                )))
            }
        }
    }

    /// Request a cooperative stop and wait, bounded, for the loop to release the
    /// camera. On timeout the controller stays in `StopRequested`.
    pub async fn stop(&mut self) -> Result<(), CaptureError> {
        let mut handle = match std::mem::replace(&mut self.state, CaptureState::Stopped) {
            CaptureState::Stopped => return Ok(()),
            CaptureState::Running {
                handle,
                cancel_token,
            } => {
                cancel_token.cancel();
                handle
            }
            CaptureState::StopRequested { handle } => handle,
        };

        match tokio::time::timeout(self.stop_timeout, &mut handle).await {
            Ok(result) => {
                info!("capture loop stopped: {:?}", exit_from_join(result));
                Ok(())
            }
            Err(_) => {
                warn!(
                    "capture loop did not confirm stop within {:?}",
                    self.stop_timeout
                );
                self.state = CaptureState::StopRequested { handle };
                Err(CaptureError::StopTimedOut)
            }
        }
    }

    /// Resolves when a running loop ends on its own (device lost). Pending
    /// forever when no loop is running, so it can sit in a `select!`.
    pub async fn exited(&mut self) -> LoopExit {
        let CaptureState::Running { handle, .. } = &mut self.state else {
            return std::future::pending().await;
        };
        let exit = exit_from_join(handle.await);
        self.state = CaptureState::Stopped;
        exit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{GestureSource, SourceError};
    use crate::models::{Classification, Move, CODE_ROCK};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeCamera {
        fail_open: bool,
        lose_after: Option<usize>,
        opened: AtomicUsize,
        held: Arc<AtomicBool>,
    }

    struct FakeSource {
        held: Arc<AtomicBool>,
        lose_after: Option<usize>,
        reads: usize,
    }

    impl GestureInput for FakeCamera {
        fn describe(&self) -> String {
            "fake camera".into()
        }

        fn open(&self) -> Result<Box<dyn GestureSource>, CaptureError> {
            if self.fail_open {
                return Err(CaptureError::CameraUnavailable("no device".into()));
            }
            assert!(!self.held.swap(true, Ordering::SeqCst), "camera opened twice");
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeSource {
                held: self.held.clone(),
                lose_after: self.lose_after,
                reads: 0,
            }))
        }
    }

    impl GestureSource for FakeSource {
        fn pause(&self) -> Duration {
            Duration::from_millis(2)
        }

        fn sample(&mut self) -> Result<i32, SourceError> {
            self.reads += 1;
            match self.lose_after {
                Some(limit) if self.reads > limit => Err(SourceError::Device("unplugged".into())),
                _ => Ok(CODE_ROCK),
            }
        }

        fn release(self: Box<Self>) {
            self.held.store(false, Ordering::SeqCst);
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn start_then_stop_releases_camera() {
        let camera = Arc::new(FakeCamera::default());
        let mut controller = CaptureController::new(Duration::from_secs(1));

        let reader = controller.start(camera.clone()).await.unwrap();
        assert_eq!(controller.lifecycle(), LoopLifecycle::Running);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(
            reader.snapshot().classification,
            Classification::Gesture(Move::Rock)
        );

        controller.stop().await.unwrap();
        assert_eq!(controller.lifecycle(), LoopLifecycle::Stopped);
        assert!(!camera.held.load(Ordering::SeqCst));

        // Restart reuses the camera without tripping the double-open check.
        controller.start(camera.clone()).await.unwrap();
        controller.stop().await.unwrap();
        assert_eq!(camera.opened.load(Ordering::SeqCst), 2);
        // Cancel so the runtime is not left waiting on a blocking worker.
        let _ = controller.stop().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn second_start_is_rejected() {
        let camera = Arc::new(FakeCamera::default());
        let mut controller = CaptureController::new(Duration::from_secs(1));
        let _reader = controller.start(camera.clone()).await.unwrap();
        assert_eq!(
            controller.start(camera.clone()).await.err(),
            Some(CaptureError::AlreadyRunning)
        );
        controller.stop().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn open_failure_is_camera_unavailable() {
        let camera = Arc::new(FakeCamera {
            fail_open: true,
            ..FakeCamera::default()
        });
        let mut controller = CaptureController::new(Duration::from_secs(1));
        assert!(matches!(
            controller.start(camera).await,
            Err(CaptureError::CameraUnavailable(_))
        ));
        assert_eq!(controller.lifecycle(), LoopLifecycle::Stopped);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn device_loss_is_reported_through_exited() {
        let camera = Arc::new(FakeCamera {
            lose_after: Some(3),
            ..FakeCamera::default()
        });
        let mut controller = CaptureController::new(Duration::from_secs(1));
        let _reader = controller.start(camera.clone()).await.unwrap();

        let exit = tokio::time::timeout(Duration::from_secs(2), controller.exited())
            .await
            .unwrap();
        assert_eq!(exit, LoopExit::DeviceLost("unplugged".into()));
        assert_eq!(controller.lifecycle(), LoopLifecycle::Stopped);
        assert!(!camera.held.load(Ordering::SeqCst));
    }

    #[derive(Default)]
    struct SlowCamera {
        opened: AtomicUsize,
        held: Arc<AtomicBool>,
    }

    struct SlowSource {
        held: Arc<AtomicBool>,
    }

    impl GestureInput for SlowCamera {
        fn describe(&self) -> String {
            "slow camera".into()
        }

        fn open(&self) -> Result<Box<dyn GestureSource>, CaptureError> {
            assert!(!self.held.swap(true, Ordering::SeqCst), "camera opened twice");
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(SlowSource {
                held: self.held.clone(),
            }))
        }
    }

    impl GestureSource for SlowSource {
        fn pause(&self) -> Duration {
            Duration::ZERO
        }

        fn sample(&mut self) -> Result<i32, SourceError> {
            std::thread::sleep(Duration::from_millis(300));
            Ok(CODE_ROCK)
        }

        fn release(self: Box<Self>) {
            self.held.store(false, Ordering::SeqCst);
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn slow_loop_stays_draining_until_it_lets_go() {
        let camera = Arc::new(SlowCamera::default());
        let mut controller = CaptureController::new(Duration::from_millis(50));
        let _reader = controller.start(camera.clone()).await.unwrap();

        assert_eq!(controller.stop().await, Err(CaptureError::StopTimedOut));
        assert_eq!(controller.lifecycle(), LoopLifecycle::StopRequested);
        assert!(camera.held.load(Ordering::SeqCst));

        assert_eq!(
            controller.start(camera.clone()).await.err(),
            Some(CaptureError::StillDraining)
        );
        assert_eq!(controller.lifecycle(), LoopLifecycle::StopRequested);
        assert_eq!(camera.opened.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(!camera.held.load(Ordering::SeqCst));

        let _reader = controller.start(camera.clone()).await.unwrap();
        assert_eq!(controller.lifecycle(), LoopLifecycle::Running);
        assert_eq!(camera.opened.load(Ordering::SeqCst), 2);
        // Cancel so the runtime is not left waiting on a blocking worker.
        let _ = controller.stop().await;
    }

    #[tokio::test]
    async fn stop_without_loop_is_a_no_op() {
        let mut controller = CaptureController::new(Duration::from_millis(10));
        controller.stop().await.unwrap();
        assert_eq!(controller.lifecycle(), LoopLifecycle::Stopped);
    }
}
