use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tokio_util::sync::CancellationToken;

use crate::models::Classification;

use super::slot::SlotWriter;
use super::source::{GestureSource, SourceError};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopExit {
    /// Stop was requested and honoured.
    Stopped,
    /// The device failed; the loop released it and quit on its own.
    DeviceLost(String),
}

/// Body of the capture loop. Blocking; runs on its own worker thread.
///
/// Checks `cancel` once per iteration, publishes every successful sample into
/// the slot, and releases the source itself before returning.
pub fn capture_loop(
    mut source: Box<dyn GestureSource>,
    writer: SlotWriter,
    cancel: CancellationToken,
) -> LoopExit {
    let pause = source.pause();
    let mut published: u64 = 0;
    let mut skipped: u64 = 0;
    log_debug!("capture loop running, {:?} between samples", pause);

    let exit = loop {
        if cancel.is_cancelled() {
            break LoopExit::Stopped;
        }

        let sampled = match catch_unwind(AssertUnwindSafe(|| source.sample())) {
            Ok(sampled) => sampled,
            Err(payload) => {
                let reason = format!("capture loop crashed: {}", panic_message(&*payload));
                log_error!("{reason}");
                break LoopExit::DeviceLost(reason);
            }
        };

        match sampled {
            Ok(code) => {
                writer.publish(Classification::from_code(code));
                published += 1;
            }
            Err(SourceError::Sample(reason)) => {
                skipped += 1;
                log_warn!("gesture sample skipped: {reason}");
            }
            Err(SourceError::Device(reason)) => {
                log_error!("capture device lost: {reason}");
                break LoopExit::DeviceLost(reason);
            }
        }

        if !pause.is_zero() {
            std::thread::sleep(pause);
        }
    };

    source.release();
    log_info!(
        "capture loop finished ({:?}): {} published, {} skipped",
        exit,
        published,
        skipped
    );
    exit
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::gesture_slot;
    use crate::models::{Move, CODE_PAPER, CODE_SCISSORS};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Default)]
    struct Probe {
        samples: AtomicUsize,
        released: AtomicBool,
        sampled_after_release: AtomicBool,
    }

    struct ScriptedSource {
        script: VecDeque<Result<i32, SourceError>>,
        probe: Arc<Probe>,
    }

    impl GestureSource for ScriptedSource {
        fn pause(&self) -> Duration {
            Duration::from_millis(1)
        }

        fn sample(&mut self) -> Result<i32, SourceError> {
            if self.probe.released.load(Ordering::SeqCst) {
                self.probe.sampled_after_release.store(true, Ordering::SeqCst);
            }
            self.probe.samples.fetch_add(1, Ordering::SeqCst);
            self.script.pop_front().unwrap_or(Ok(CODE_PAPER))
        }

        fn release(self: Box<Self>) {
            self.probe.released.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn classifier_failures_do_not_stop_the_loop() {
        let probe = Arc::new(Probe::default());
        let source = ScriptedSource {
            script: VecDeque::from(vec![
                Err(SourceError::Sample("blurry".into())),
                Ok(CODE_SCISSORS),
                Err(SourceError::Device("unplugged".into())),
            ]),
            probe: probe.clone(),
        };
        let (writer, reader) = gesture_slot();

        let exit = capture_loop(Box::new(source), writer, CancellationToken::new());

        assert_eq!(exit, LoopExit::DeviceLost("unplugged".into()));
        assert_eq!(probe.samples.load(Ordering::SeqCst), 3);
        assert!(probe.released.load(Ordering::SeqCst));
        assert_eq!(
            reader.snapshot().classification,
            Classification::Gesture(Move::Scissors)
        );
    }

    #[test]
    fn stop_request_releases_source_and_ends_sampling() {
        let probe = Arc::new(Probe::default());
        let source = ScriptedSource {
            script: VecDeque::new(),
            probe: probe.clone(),
        };
        let (writer, reader) = gesture_slot();
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let worker = std::thread::spawn(move || capture_loop(Box::new(source), writer, token));
        while probe.samples.load(Ordering::SeqCst) < 3 {
            std::thread::sleep(Duration::from_millis(1));
        }
        cancel.cancel();
        let exit = worker.join().unwrap();

        assert_eq!(exit, LoopExit::Stopped);
        assert!(probe.released.load(Ordering::SeqCst));
        assert!(!probe.sampled_after_release.load(Ordering::SeqCst));
        let after = probe.samples.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(probe.samples.load(Ordering::SeqCst), after);
        assert!(reader.is_orphaned());
    }

    struct CrashingSource {
        probe: Arc<Probe>,
        crash_on: usize,
    }

    impl GestureSource for CrashingSource {
        fn pause(&self) -> Duration {
            Duration::ZERO
        }

        fn sample(&mut self) -> Result<i32, SourceError> {
            let n = self.probe.samples.fetch_add(1, Ordering::SeqCst) + 1;
            if n == self.crash_on {
                panic!("classifier blew up");
            }
            Ok(CODE_PAPER)
        }

        fn release(self: Box<Self>) {
            self.probe.released.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn panicking_sample_still_releases_source() {
        let probe = Arc::new(Probe::default());
        let source = CrashingSource {
            probe: probe.clone(),
            crash_on: 3,
        };
        let (writer, reader) = gesture_slot();

        let exit = capture_loop(Box::new(source), writer, CancellationToken::new());

        assert_eq!(
            exit,
            LoopExit::DeviceLost("capture loop crashed: classifier blew up".into())
        );
        assert_eq!(probe.samples.load(Ordering::SeqCst), 3);
        assert!(probe.released.load(Ordering::SeqCst));
        assert_eq!(
            reader.snapshot().classification,
            Classification::Gesture(Move::Paper)
        );
    }

    #[test]
    fn already_cancelled_loop_never_samples() {
        let probe = Arc::new(Probe::default());
        let source = ScriptedSource {
            script: VecDeque::new(),
            probe: probe.clone(),
        };
        let (writer, _reader) = gesture_slot();
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert_eq!(capture_loop(Box::new(source), writer, cancel), LoopExit::Stopped);
        assert_eq!(probe.samples.load(Ordering::SeqCst), 0);
        assert!(probe.released.load(Ordering::SeqCst));
    }
}
