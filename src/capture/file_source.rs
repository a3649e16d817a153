//! Legacy gesture input: an external recogniser writes its current code into a
//! text file, and we poll it.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use super::source::{CaptureError, GestureInput, GestureSource, SourceError};

#[derive(Debug, Clone)]
pub struct FileInput {
    path: PathBuf,
    poll_interval: Duration,
}

impl FileInput {
    pub fn new(path: impl Into<PathBuf>, poll_interval: Duration) -> Self {
        Self {
            path: path.into(),
            poll_interval,
        }
    }
}

impl GestureInput for FileInput {
    fn describe(&self) -> String {
        format!("gesture file {}", self.path.display())
    }

    fn open(&self) -> Result<Box<dyn GestureSource>, CaptureError> {
        fs::metadata(&self.path).map_err(|err| {
            CaptureError::CameraUnavailable(format!("{}: {err}", self.path.display()))
        })?;
        Ok(Box::new(FileSource {
            path: self.path.clone(),
            poll_interval: self.poll_interval,
        }))
    }
}

struct FileSource {
    path: PathBuf,
    poll_interval: Duration,
}

impl GestureSource for FileSource {
    fn pause(&self) -> Duration {
        self.poll_interval
    }

    fn sample(&mut self) -> Result<i32, SourceError> {
        // The writer may be mid-rewrite; treat every read problem as transient.
        let contents = fs::read_to_string(&self.path)
            .map_err(|err| SourceError::Sample(format!("{}: {err}", self.path.display())))?;
        contents
            .trim()
            .parse::<i32>()
            .map_err(|err| SourceError::Sample(format!("bad gesture code {:?}: {err}", contents.trim())))
    }

    fn release(self: Box<Self>) {}
}
