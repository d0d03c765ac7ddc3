// FFmpeg adapter - Media backend on libav bindings

use std::path::Path;

use tracing::info;

use crate::error::{ConcatError, ConcatResult};
use crate::ports::{MediaBackend, SinkSettings, VideoSink, VideoSource};

pub mod sink;
pub mod source;

pub use sink::FfmpegSink;
pub use source::FfmpegSource;

/// Opens sources and sinks through libavformat/libavcodec
pub struct FfmpegBackend;

impl FfmpegBackend {
    pub fn new() -> ConcatResult<Self> {
        ffmpeg_next::init().map_err(|e| ConcatError::BackendUnavailable {
            message: format!("FFmpeg initialization failed: {}", e),
        })?;
        // damaged segments make the decoders very chatty
        ffmpeg_next::util::log::set_level(ffmpeg_next::util::log::Level::Fatal);
        info!("FFmpeg backend initialized");
        Ok(Self)
    }
}

impl MediaBackend for FfmpegBackend {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    fn open_source(&self, path: &Path) -> ConcatResult<Box<dyn VideoSource>> {
        Ok(Box::new(FfmpegSource::open(path)?))
    }

    fn open_sink(&self, settings: &SinkSettings) -> ConcatResult<Box<dyn VideoSink>> {
        Ok(Box::new(FfmpegSink::open(settings)?))
    }
}
