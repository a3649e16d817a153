pub mod camera;
pub mod controller;
pub mod file_source;
pub mod loop_worker;
pub mod slot;
pub mod source;

pub use camera::{
    CameraDevice, CameraError, CameraHandle, CameraInput, ClassifierError, ClassifierFactory,
    Frame, GestureClassifier, ImageDirCamera,
};
pub use controller::{CaptureController, LoopLifecycle};
pub use file_source::FileInput;
pub use loop_worker::LoopExit;
pub use slot::{gesture_slot, Observation, SlotReader, SlotWriter};
pub use source::{CaptureError, GestureInput, GestureSource, SourceError};
