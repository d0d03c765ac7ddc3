// Adapters - External system implementations

#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;
pub mod json_config;
pub mod signal;
pub mod tracing_log;

// Re-export adapters
#[cfg(feature = "ffmpeg")]
pub use ffmpeg::FfmpegBackend;
pub use json_config::JsonConfigAdapter;
pub use signal::CtrlCInterrupts;
pub use tracing_log::{init_logging, LogLevel};

use crate::error::ConcatResult;
use crate::ports::MediaBackend;

/// Media backend compiled into this build
#[cfg(feature = "ffmpeg")]
pub fn default_backend() -> ConcatResult<Box<dyn MediaBackend>> {
    Ok(Box::new(FfmpegBackend::new()?))
}

/// Media backend compiled into this build
#[cfg(not(feature = "ffmpeg"))]
pub fn default_backend() -> ConcatResult<Box<dyn MediaBackend>> {
    Err(crate::error::ConcatError::BackendUnavailable {
        message: "built without the `ffmpeg` feature".to_string(),
    })
}
