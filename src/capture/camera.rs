//! Camera and classifier collaborators, and the source that glues them into
//! the capture loop.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use image::RgbImage;

use super::source::{CaptureError, GestureInput, GestureSource, SourceError};

pub type Frame = RgbImage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraError(pub String);

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for CameraError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierError(pub String);

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "classifier failed: {}", self.0)
    }
}

impl std::error::Error for ClassifierError {}

pub trait CameraDevice: Send + Sync {
    fn open(&self) -> Result<Box<dyn CameraHandle>, CameraError>;
}

/// An open camera. `release` consumes the handle, so nothing can read from it
/// afterwards.
pub trait CameraHandle: Send {
    fn read_frame(&mut self) -> Result<Frame, CameraError>;
    fn release(self: Box<Self>);
}

/// Maps a frame to a raw recogniser code. `mirror` asks the classifier to
/// treat the frame as a selfie view.
pub trait GestureClassifier: Send {
    fn classify(&mut self, frame: &Frame, mirror: bool) -> Result<i32, ClassifierError>;
}

pub type ClassifierFactory = Arc<dyn Fn() -> Box<dyn GestureClassifier> + Send + Sync>;

pub struct CameraInput {
    device: Arc<dyn CameraDevice>,
    classifier: ClassifierFactory,
    mirror: bool,
    frame_delay: Duration,
}

impl CameraInput {
    pub fn new(
        device: Arc<dyn CameraDevice>,
        classifier: ClassifierFactory,
        mirror: bool,
        frame_delay: Duration,
    ) -> Self {
        Self {
            device,
            classifier,
            mirror,
            frame_delay,
        }
    }
}

impl GestureInput for CameraInput {
    fn describe(&self) -> String {
        format!("camera (mirror={})", self.mirror)
    }

    fn open(&self) -> Result<Box<dyn GestureSource>, CaptureError> {
        let handle = self
            .device
            .open()
            .map_err(|err| CaptureError::CameraUnavailable(err.to_string()))?;
        Ok(Box::new(CameraSource {
            handle,
            classifier: (self.classifier)(),
            mirror: self.mirror,
            frame_delay: self.frame_delay,
        }))
    }
}

struct CameraSource {
    handle: Box<dyn CameraHandle>,
    classifier: Box<dyn GestureClassifier>,
    mirror: bool,
    frame_delay: Duration,
}

impl GestureSource for CameraSource {
    fn pause(&self) -> Duration {
        self.frame_delay
    }

    fn sample(&mut self) -> Result<i32, SourceError> {
        let frame = self
            .handle
            .read_frame()
            .map_err(|err| SourceError::Device(err.to_string()))?;
        self.classifier
            .classify(&frame, self.mirror)
            .map_err(|err| SourceError::Sample(err.to_string()))
    }

    fn release(self: Box<Self>) {
        self.handle.release();
    }
}

/// Replays still images from a directory, in file-name order, as if they came
/// from a camera. Useful for demos and for exercising a classifier offline.
#[derive(Debug, Clone)]
pub struct ImageDirCamera {
    dir: PathBuf,
}

impl ImageDirCamera {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg" | "bmp"))
        .unwrap_or(false)
}

impl CameraDevice for ImageDirCamera {
    fn open(&self) -> Result<Box<dyn CameraHandle>, CameraError> {
        let entries = std::fs::read_dir(&self.dir)
            .map_err(|err| CameraError(format!("{}: {err}", self.dir.display())))?;
        let mut frames: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_image(path))
            .collect();
        frames.sort();

        if frames.is_empty() {
            return Err(CameraError(format!(
                "no frames found in {}",
                self.dir.display()
            )));
        }

        Ok(Box::new(ImageDirHandle { frames, next: 0 }))
    }
}

struct ImageDirHandle {
    frames: Vec<PathBuf>,
    next: usize,
}

impl CameraHandle for ImageDirHandle {
    fn read_frame(&mut self) -> Result<Frame, CameraError> {
        let path = &self.frames[self.next % self.frames.len()];
        self.next = self.next.wrapping_add(1);
        image::open(path)
            .map(|img| img.to_rgb8())
            .map_err(|err| CameraError(format!("{}: {err}", path.display())))
    }

    fn release(self: Box<Self>) {
        log::debug!("image replay camera released after {} frames", self.next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CODE_ROCK;
    use uuid::Uuid;

    struct BrightnessClassifier;

    impl GestureClassifier for BrightnessClassifier {
        fn classify(&mut self, frame: &Frame, _mirror: bool) -> Result<i32, ClassifierError> {
            match frame.get_pixel(0, 0).0 {
                [255, _, _] => Ok(CODE_ROCK),
                [0, 0, 0] => Err(ClassifierError("dark frame".into())),
                _ => Ok(-1),
            }
        }
    }

    fn frames_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rps-frames-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let mut red = RgbImage::new(2, 2);
        red.put_pixel(0, 0, image::Rgb([255, 0, 0]));
        red.save(dir.join("000.png")).unwrap();
        RgbImage::new(2, 2).save(dir.join("001.png")).unwrap();
        std::fs::write(dir.join("notes.txt"), "not a frame").unwrap();
        dir
    }

    #[test]
    fn replays_frames_through_classifier() {
        let dir = frames_dir();
        let input = CameraInput::new(
            Arc::new(ImageDirCamera::new(&dir)),
            Arc::new(|| Box::new(BrightnessClassifier) as Box<dyn GestureClassifier>),
            true,
            Duration::from_millis(10),
        );

        let mut source = input.open().unwrap();
        assert_eq!(source.sample(), Ok(CODE_ROCK));
        assert!(matches!(source.sample(), Err(SourceError::Sample(_))));
        assert_eq!(source.sample(), Ok(CODE_ROCK));
        source.release();
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn missing_directory_is_camera_unavailable() {
        let input = CameraInput::new(
            Arc::new(ImageDirCamera::new("/definitely/not/here")),
            Arc::new(|| Box::new(BrightnessClassifier) as Box<dyn GestureClassifier>),
            true,
            Duration::from_millis(10),
        );
        assert!(matches!(input.open(), Err(CaptureError::CameraUnavailable(_))));
    }
}
