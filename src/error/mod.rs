//! Error handling module for segment concatenation

use thiserror::Error;

/// Main error type for concatenation operations
#[derive(Error, Debug)]
pub enum ConcatError {
    /// Task file does not exist
    #[error("Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// Task file is malformed or describes an invalid task
    #[error("Config error: {message}")]
    Config { message: String },

    /// Caller supplied an unusable argument (missing directory, bad pattern)
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Task cannot be executed as configured
    #[error("Task is not runnable: {message}")]
    TaskNotRunnable { message: String },

    /// Input video could not be opened or decoded
    #[error("Video source error ({path}): {message}")]
    Source { path: String, message: String },

    /// Output video could not be opened or written
    #[error("Video sink error ({path}): {message}")]
    Sink { path: String, message: String },

    /// A frame post-processor failed
    #[error("Post-processor '{name}' failed: {message}")]
    PostProcessor { name: String, message: String },

    /// No media backend was compiled in
    #[error("Media backend unavailable: {message}")]
    BackendUnavailable { message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Image encoding error
    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    /// FFmpeg error
    #[cfg(feature = "ffmpeg")]
    #[error("FFmpeg error: {0}")]
    FFmpegError(#[from] ffmpeg_next::Error),
}

impl ConcatError {
    /// Shorthand for configuration errors
    pub fn config(message: impl Into<String>) -> Self {
        ConcatError::Config {
            message: message.into(),
        }
    }

    /// Shorthand for invalid input errors
    pub fn invalid_input(message: impl Into<String>) -> Self {
        ConcatError::InvalidInput {
            message: message.into(),
        }
    }
}

/// Result type alias for concatenation operations
pub type ConcatResult<T> = std::result::Result<T, ConcatError>;
