//! The one piece of state shared between the capture loop and the control loop.
//!
//! [`gesture_slot`] hands out exactly one [`SlotWriter`] and one [`SlotReader`].
//! Neither is `Clone`, so the single-writer / single-reader discipline is carried
//! by ownership: the capture loop owns the writer, the capture window reads.
//! The classification and its timestamp travel as one [`Observation`] value
//! through a `watch` channel, so a reader can never see half of an update.

use tokio::sync::watch;
use tokio::time::Instant;

use crate::models::Classification;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub classification: Classification,
    pub observed_at: Instant,
}

impl Observation {
    pub fn now(classification: Classification) -> Self {
        Self {
            classification,
            observed_at: Instant::now(),
        }
    }
}

#[derive(Debug)]
pub struct SlotWriter {
    tx: watch::Sender<Observation>,
}

#[derive(Debug)]
pub struct SlotReader {
    rx: watch::Receiver<Observation>,
}

/// Create an empty slot. It starts out holding `NoGesture`.
pub fn gesture_slot() -> (SlotWriter, SlotReader) {
    let (tx, rx) = watch::channel(Observation::now(Classification::NoGesture));
    (SlotWriter { tx }, SlotReader { rx })
}

impl SlotWriter {
    /// Publish a classification stamped with the current time.
    pub fn publish(&self, classification: Classification) {
        self.publish_observation(Observation::now(classification));
    }

    pub fn publish_observation(&self, observation: Observation) {
        // send_replace never fails, even once the reader is gone.
        self.tx.send_replace(observation);
    }
}

impl SlotReader {
    /// Copy out the latest observation as one consistent pair.
    pub fn snapshot(&self) -> Observation {
        *self.rx.borrow()
    }

    /// True once the writer side has been dropped (capture loop gone).
    pub fn is_orphaned(&self) -> bool {
        self.rx.has_changed().is_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Move;
    use std::time::Duration;

    #[test]
    fn starts_empty() {
        let (_writer, reader) = gesture_slot();
        assert_eq!(reader.snapshot().classification, Classification::NoGesture);
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_sees_last_completed_publish() {
        let (writer, reader) = gesture_slot();
        writer.publish(Classification::Gesture(Move::Paper));
        tokio::time::advance(Duration::from_millis(30)).await;
        writer.publish(Classification::Gesture(Move::Rock));
        let observed_at = Instant::now();

        let snap = reader.snapshot();
        assert_eq!(snap.classification, Classification::Gesture(Move::Rock));
        assert_eq!(snap.observed_at, observed_at);
    }

    #[test]
    fn publishes_from_another_thread_are_never_torn() {
        let (writer, reader) = gesture_slot();
        let base = Instant::now();
        let handle = std::thread::spawn(move || {
            for i in 0..2_000u64 {
                let mv = Move::ALL[(i % 3) as usize];
                // Timestamp encodes the move so a torn read is detectable.
                writer.publish_observation(Observation {
                    classification: Classification::Gesture(mv),
                    observed_at: base + Duration::from_millis(i % 3),
                });
            }
        });

        for _ in 0..2_000 {
            let snap = reader.snapshot();
            if let Classification::Gesture(mv) = snap.classification {
                let idx = Move::ALL.iter().position(|m| *m == mv).unwrap_or(usize::MAX) as u64;
                assert_eq!(snap.observed_at, base + Duration::from_millis(idx));
            }
        }
        handle.join().unwrap();
        assert!(reader.is_orphaned());
    }
}
