// Domain models - Task description and related value types

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::error::{ConcatError, ConcatResult};
use crate::utils::time::{format_timestamp, validate_strftime};

/// Default output frame width
pub const DEFAULT_OUTPUT_WIDTH: u32 = 960;
/// Default output frame height
pub const DEFAULT_OUTPUT_HEIGHT: u32 = 540;
/// Default number of grabs discarded after each emitted frame
pub const DEFAULT_SKIP_FRAME_COUNT: u32 = 110;
/// Default strftime pattern for the output file prefix
pub const DEFAULT_PREFIX_TIME_FORMAT: &str = "%Y%m%d%H%M";
/// Default output frame rate
pub const DEFAULT_OUTPUT_FPS: f64 = 30.0;
/// Default output codec name
pub const DEFAULT_OUTPUT_CODEC: &str = "h264";

/// Frame dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Create a resolution, rejecting zero dimensions
    pub fn new(width: u32, height: u32) -> ConcatResult<Self> {
        if width == 0 || height == 0 {
            return Err(ConcatError::config(format!(
                "Video dimensions cannot be zero ({}x{})",
                width, height
            )));
        }
        Ok(Self { width, height })
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One concatenation job
///
/// Produced by [`TaskConfigBuilder::build`]; read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskConfig {
    input_files: Vec<PathBuf>,
    output_path_template: Option<PathBuf>,
    auto_date_prefix: bool,
    prefix_time_format: String,
    resolution: Resolution,
    skip_frame_count: u32,
    output_fps: f64,
    output_codec: String,
    object_detection_path_template: Option<PathBuf>,
}

impl TaskConfig {
    /// Start building a task with default settings
    pub fn builder() -> TaskConfigBuilder {
        TaskConfigBuilder::default()
    }

    pub fn input_files(&self) -> &[PathBuf] {
        &self.input_files
    }

    pub fn output_path_template(&self) -> Option<&Path> {
        self.output_path_template.as_deref()
    }

    pub fn auto_date_prefix(&self) -> bool {
        self.auto_date_prefix
    }

    pub fn prefix_time_format(&self) -> &str {
        &self.prefix_time_format
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn output_width(&self) -> u32 {
        self.resolution.width
    }

    pub fn output_height(&self) -> u32 {
        self.resolution.height
    }

    pub fn skip_frame_count(&self) -> u32 {
        self.skip_frame_count
    }

    pub fn output_fps(&self) -> f64 {
        self.output_fps
    }

    pub fn output_codec(&self) -> &str {
        &self.output_codec
    }

    /// Detection video requested for this task, before any date prefix
    pub fn object_detection_path_template(&self) -> Option<&Path> {
        self.object_detection_path_template.as_deref()
    }

    /// True when an output path is set and its parent directory exists.
    ///
    /// Input files are not checked; whoever produced the list owns that.
    pub fn is_runnable(&self) -> bool {
        match &self.output_path_template {
            Some(path) => output_parent(path).is_dir(),
            None => false,
        }
    }

    /// Output path for a run started at `now`.
    ///
    /// With `auto_date_prefix`, `format(now, prefix_time_format) + "_"` is
    /// prepended to the file name; the parent directory is never touched.
    pub fn actual_output_path(&self, now: NaiveDateTime) -> ConcatResult<PathBuf> {
        let template = self
            .output_path_template
            .as_ref()
            .ok_or_else(|| ConcatError::TaskNotRunnable {
                message: "output path is not set".to_string(),
            })?;
        self.dated_path(template, now)
    }

    /// Detection video path for a run started at `now`, prefixed like the
    /// main output
    pub fn actual_object_detection_path(
        &self,
        now: NaiveDateTime,
    ) -> ConcatResult<Option<PathBuf>> {
        self.object_detection_path_template
            .as_ref()
            .map(|template| self.dated_path(template, now))
            .transpose()
    }

    fn dated_path(&self, template: &Path, now: NaiveDateTime) -> ConcatResult<PathBuf> {
        if !self.auto_date_prefix {
            return Ok(template.to_path_buf());
        }

        let file_name = template
            .file_name()
            .ok_or_else(|| ConcatError::TaskNotRunnable {
                message: format!("output path has no file name: {}", template.display()),
            })?;
        let prefix = format_timestamp(&now, &self.prefix_time_format)?;

        let mut prefixed = std::ffi::OsString::from(format!("{}_", prefix));
        prefixed.push(file_name);
        Ok(template.with_file_name(prefixed))
    }
}

impl fmt::Display for TaskConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let output = self
            .output_path_template
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<unset>".to_string());
        write!(
            f,
            "Task (inputs[{} files] -> output[{}], {} @ {} fps, skip {})",
            self.input_files.len(),
            output,
            self.resolution,
            self.output_fps,
            self.skip_frame_count
        )?;
        if let Some(path) = &self.object_detection_path_template {
            write!(f, " + detections[{}]", path.display())?;
        }
        Ok(())
    }
}

/// Parent directory of an output path; a bare file name lives in the
/// current directory.
fn output_parent(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Builder for [`TaskConfig`]
#[derive(Debug, Clone)]
pub struct TaskConfigBuilder {
    input_files: Vec<PathBuf>,
    output_path_template: Option<PathBuf>,
    auto_date_prefix: bool,
    prefix_time_format: String,
    output_width: u32,
    output_height: u32,
    skip_frame_count: u32,
    output_fps: f64,
    output_codec: String,
    object_detection_path_template: Option<PathBuf>,
}

impl Default for TaskConfigBuilder {
    fn default() -> Self {
        Self {
            input_files: Vec::new(),
            output_path_template: None,
            auto_date_prefix: true,
            prefix_time_format: DEFAULT_PREFIX_TIME_FORMAT.to_string(),
            output_width: DEFAULT_OUTPUT_WIDTH,
            output_height: DEFAULT_OUTPUT_HEIGHT,
            skip_frame_count: DEFAULT_SKIP_FRAME_COUNT,
            output_fps: DEFAULT_OUTPUT_FPS,
            output_codec: DEFAULT_OUTPUT_CODEC.to_string(),
            object_detection_path_template: None,
        }
    }
}

impl TaskConfigBuilder {
    pub fn input_files<I, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.input_files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path_template = Some(path.into());
        self
    }

    pub fn auto_date_prefix(mut self, enabled: bool) -> Self {
        self.auto_date_prefix = enabled;
        self
    }

    pub fn prefix_time_format(mut self, pattern: impl Into<String>) -> Self {
        self.prefix_time_format = pattern.into();
        self
    }

    pub fn output_size(mut self, width: u32, height: u32) -> Self {
        self.output_width = width;
        self.output_height = height;
        self
    }

    pub fn skip_frame_count(mut self, count: u32) -> Self {
        self.skip_frame_count = count;
        self
    }

    pub fn output_fps(mut self, fps: f64) -> Self {
        self.output_fps = fps;
        self
    }

    pub fn output_codec(mut self, codec: impl Into<String>) -> Self {
        self.output_codec = codec.into();
        self
    }

    /// Also write frames with detections to a video at `path`
    pub fn object_detection_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.object_detection_path_template = Some(path.into());
        self
    }

    /// Validate and freeze the task
    pub fn build(self) -> ConcatResult<TaskConfig> {
        let resolution = Resolution::new(self.output_width, self.output_height)?;

        if !(self.output_fps.is_finite() && self.output_fps > 0.0) {
            return Err(ConcatError::config(format!(
                "Output frame rate must be positive, got {}",
                self.output_fps
            )));
        }
        if self.output_codec.trim().is_empty() {
            return Err(ConcatError::config("Output codec cannot be empty"));
        }
        validate_strftime(&self.prefix_time_format)
            .map_err(|e| ConcatError::config(e.to_string()))?;

        Ok(TaskConfig {
            input_files: self.input_files,
            output_path_template: self.output_path_template,
            auto_date_prefix: self.auto_date_prefix,
            prefix_time_format: self.prefix_time_format,
            resolution,
            skip_frame_count: self.skip_frame_count,
            output_fps: self.output_fps,
            output_codec: self.output_codec,
            object_detection_path_template: self.object_detection_path_template,
        })
    }
}

#[cfg(test)]
mod tests;
