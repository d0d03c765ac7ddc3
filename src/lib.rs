//! Segment Concat Library
//!
//! Concatenates hour-segmented surveillance camera recordings into one
//! continuous video, skipping corrupted spans and unstable frames, and fans
//! every emitted frame out to optional analysis post-processors.

pub mod adapters;
pub mod cli;
pub mod discovery;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ports;
pub mod postprocess;
pub mod utils;

// Re-export commonly used types
pub use discovery::{SearchWindow, TimeWindowSearcher};
pub use domain::model::{Resolution, TaskConfig, TaskConfigBuilder};
pub use engine::{
    BatchReport, ConcatenationDriver, FrameHealthTracker, SourceOutcome, TaskOrchestrator,
    TaskReport, TaskStatus,
};
pub use error::{ConcatError, ConcatResult};
pub use ports::{Frame, Interrupt, InterruptSource, MediaBackend, VideoSink, VideoSource};
pub use postprocess::{
    Detection, DetectionPostProcessor, DetectorFactory, FramePostProcessor, ObjectDetector,
    PostProcessorRegistry,
};
