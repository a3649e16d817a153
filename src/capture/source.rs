use std::fmt;
use std::time::Duration;

/// Something that can be opened into a running [`GestureSource`]. Opening may
/// block (camera warm-up, file system), so it is only ever called off the
/// control loop.
pub trait GestureInput: Send + Sync {
    fn describe(&self) -> String;
    fn open(&self) -> Result<Box<dyn GestureSource>, CaptureError>;
}

/// An opened producer of raw recogniser codes. Owned by exactly one capture
/// loop, which is also the only place `release` is called.
pub trait GestureSource: Send {
    /// Delay between iterations of the capture loop.
    fn pause(&self) -> Duration;

    /// Produce one raw recogniser code. May block for up to a frame interval.
    fn sample(&mut self) -> Result<i32, SourceError>;

    fn release(self: Box<Self>);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The device is gone; the loop must stop.
    Device(String),
    /// This one sample failed; the loop skips it and carries on.
    Sample(String),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Device(reason) => write!(f, "device failure: {reason}"),
            SourceError::Sample(reason) => write!(f, "sample failure: {reason}"),
        }
    }
}

impl std::error::Error for SourceError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    CameraUnavailable(String),
    AlreadyRunning,
    /// A previous loop was asked to stop and has not confirmed yet.
    StillDraining,
    StopTimedOut,
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::CameraUnavailable(reason) => write!(f, "camera unavailable: {reason}"),
            CaptureError::AlreadyRunning => f.write_str("capture loop already running"),
            CaptureError::StillDraining => {
                f.write_str("previous capture loop has not released the camera yet")
            }
            CaptureError::StopTimedOut => f.write_str("capture loop did not stop in time"),
        }
    }
}

impl std::error::Error for CaptureError {}
