// Ports - Interface definitions for the media collaborators

use std::path::{Path, PathBuf};

use crate::domain::model::Resolution;
use crate::error::ConcatResult;

/// Decoded frame handed between sources, sinks and post-processors
pub type Frame = image::RgbImage;

/// Forward-only decoder for one input file
///
/// `grab` advances one frame without converting it; `retrieve` converts the
/// most recently grabbed frame. Implementations never seek.
pub trait VideoSource {
    /// Advance to the next frame. Returns false on a decode failure or when
    /// nothing more can be read.
    fn grab(&mut self) -> bool;

    /// Convert the frame at the current position
    fn retrieve(&mut self) -> Option<Frame>;

    /// Release decoder resources. Safe to call more than once.
    fn release(&mut self);
}

/// Encoder for the concatenated output
pub trait VideoSink {
    /// Append a frame. The frame must match the sink resolution.
    fn write(&mut self, frame: &Frame) -> ConcatResult<()>;

    /// Flush and close the output. Safe to call more than once.
    fn release(&mut self) -> ConcatResult<()>;
}

/// Settings used to open an output sink
#[derive(Debug, Clone, PartialEq)]
pub struct SinkSettings {
    pub path: PathBuf,
    pub codec: String,
    pub fps: f64,
    pub resolution: Resolution,
}

/// Factory for sources and sinks
///
/// Shared between the orchestrator and post-processors that write their own
/// output, so opening takes `&self`.
pub trait MediaBackend {
    /// Backend identifier
    fn name(&self) -> &'static str;

    /// Open an input file for forward reading
    fn open_source(&self, path: &Path) -> ConcatResult<Box<dyn VideoSource>>;

    /// Create the output file
    fn open_sink(&self, settings: &SinkSettings) -> ConcatResult<Box<dyn VideoSink>>;
}

/// User interrupt requests observed at frame emission points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// Stop the current file and continue with the next one
    AbortFile,
    /// Stop the current file and the rest of the batch
    AbortBatch,
}

/// Cooperative interrupt polling
pub trait InterruptSource {
    /// Take the pending interrupt, if any
    fn poll(&self) -> Option<Interrupt>;
}

/// Interrupt source that never fires
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInterrupts;

impl InterruptSource for NoInterrupts {
    fn poll(&self) -> Option<Interrupt> {
        None
    }
}
