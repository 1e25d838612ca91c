pub mod duration_recorder;

pub use duration_recorder::{DurationRecorder, RecorderWorkers};
