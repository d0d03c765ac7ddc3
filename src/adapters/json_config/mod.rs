// JSON config adapter - Task files in JSON with `--` comment lines

use std::fs;
use std::path::{Path, PathBuf};

use chrono::TimeDelta;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::discovery::{SearchWindow, TimeWindowSearcher};
use crate::domain::model::{TaskConfig, DEFAULT_OUTPUT_HEIGHT, DEFAULT_OUTPUT_WIDTH};
use crate::error::{ConcatError, ConcatResult};
use crate::utils::time::parse_reference_date;

/// Required value of every task's `type` field
pub const TASK_TYPE: &str = "process_video_task";

/// Prefix marking a comment line in task files
pub const COMMENT_PREFIX: &str = "--";

/// Longest search window a task may ask for
pub const MAX_SEARCH_WINDOW_HOURS: i64 = 7 * 24;

#[derive(Debug, Deserialize)]
struct TaskFile {
    tasks: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawTask {
    #[serde(rename = "type")]
    kind: Option<String>,
    output_concatenation_filename: Option<String>,
    output_video_width: Option<u32>,
    output_video_height: Option<u32>,
    skipped_frames_count: Option<u32>,
    auto_date_prefix: Option<bool>,
    prefix_time_format: Option<String>,
    output_fps: Option<f64>,
    output_codec: Option<String>,
    output_object_detection_filename: Option<String>,
    input_files: Option<Vec<Value>>,
    video_searcher: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawSearcher {
    dir: PathBuf,
    strftime_pattern: String,
    video_length_hours: i64,
    video_length_minutes: i64,
    reference_date_delta_hours: i64,
    reference_date_delta_minutes: i64,
    #[serde(default)]
    prefix_pattern: String,
    #[serde(default)]
    suffix_pattern: String,
    reference_date: Option<String>,
}

/// Loads task batches from JSON task files
#[derive(Debug, Default, Clone)]
pub struct JsonConfigAdapter;

impl JsonConfigAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Read and parse a task file
    pub fn load_tasks(&self, path: &Path) -> ConcatResult<Vec<TaskConfig>> {
        if !path.is_file() {
            return Err(ConcatError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }
        info!("Loading tasks from {}", path.display());

        let content = fs::read_to_string(path).map_err(|e| {
            ConcatError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        self.parse_tasks(&content)
    }

    /// Parse task file content.
    ///
    /// Searcher-based tasks are resolved against the file system here, so the
    /// returned tasks carry concrete input lists.
    pub fn parse_tasks(&self, content: &str) -> ConcatResult<Vec<TaskConfig>> {
        let text = strip_comment_lines(content);
        let file: TaskFile = serde_json::from_str(&text)
            .map_err(|e| ConcatError::config(format!("Invalid task file: {}", e)))?;

        file.tasks
            .into_iter()
            .enumerate()
            .map(|(index, value)| {
                parse_task(value)
                    .map_err(|e| ConcatError::config(format!("Task {}: {}", index + 1, message(e))))
            })
            .collect()
    }
}

/// Drop every line whose raw text starts with `--`
pub fn strip_comment_lines(content: &str) -> String {
    content
        .lines()
        .filter(|line| !line.starts_with(COMMENT_PREFIX))
        .collect::<Vec<_>>()
        .join("\n")
}

fn message(error: ConcatError) -> String {
    match error {
        ConcatError::Config { message } | ConcatError::InvalidInput { message } => message,
        other => other.to_string(),
    }
}

fn parse_task(value: Value) -> ConcatResult<TaskConfig> {
    let raw: RawTask = serde_json::from_value(value)
        .map_err(|e| ConcatError::config(format!("invalid task object: {}", e)))?;

    match raw.kind.as_deref() {
        Some(TASK_TYPE) => {}
        other => {
            return Err(ConcatError::config(format!(
                "expected type \"{}\", got {:?}",
                TASK_TYPE, other
            )))
        }
    }

    let output = raw
        .output_concatenation_filename
        .ok_or_else(|| ConcatError::config("output_concatenation_filename is not set"))?;
    let input_files = resolve_input_files(raw.input_files, raw.video_searcher)?;

    let mut builder = TaskConfig::builder()
        .input_files(input_files)
        .output_path(output)
        .output_size(
            raw.output_video_width.unwrap_or(DEFAULT_OUTPUT_WIDTH),
            raw.output_video_height.unwrap_or(DEFAULT_OUTPUT_HEIGHT),
        );
    if let Some(count) = raw.skipped_frames_count {
        builder = builder.skip_frame_count(count);
    }
    if let Some(enabled) = raw.auto_date_prefix {
        builder = builder.auto_date_prefix(enabled);
    }
    if let Some(format) = raw.prefix_time_format {
        builder = builder.prefix_time_format(format);
    }
    if let Some(fps) = raw.output_fps {
        builder = builder.output_fps(fps);
    }
    if let Some(codec) = raw.output_codec {
        builder = builder.output_codec(codec);
    }
    if let Some(detection) = raw.output_object_detection_filename {
        builder = builder.object_detection_path(detection);
    }

    builder.build()
}

/// `input_files` wins over `video_searcher` when both are given
fn resolve_input_files(
    input_files: Option<Vec<Value>>,
    video_searcher: Option<Value>,
) -> ConcatResult<Vec<PathBuf>> {
    match (input_files, video_searcher) {
        (Some(files), searcher) => {
            if searcher.is_some() {
                warn!("Both input_files and video_searcher are set, using input_files");
            }
            let files = checked_input_files(files)?;
            info!("Using {} listed input files", files.len());
            Ok(files)
        }
        (None, Some(searcher)) => search_input_files(searcher),
        (None, None) => Err(ConcatError::config(
            "either input_files or video_searcher must be set",
        )),
    }
}

fn checked_input_files(files: Vec<Value>) -> ConcatResult<Vec<PathBuf>> {
    files
        .into_iter()
        .map(|value| match value {
            Value::String(file) => {
                let path = PathBuf::from(file);
                if path.is_file() {
                    Ok(path)
                } else {
                    Err(ConcatError::config(format!(
                        "not a file: \"{}\"",
                        path.display()
                    )))
                }
            }
            other => Err(ConcatError::config(format!(
                "input files must be strings, got {}",
                other
            ))),
        })
        .collect()
}

fn search_input_files(value: Value) -> ConcatResult<Vec<PathBuf>> {
    let raw: RawSearcher = serde_json::from_value(value)
        .map_err(|e| ConcatError::config(format!("invalid video_searcher: {}", e)))?;

    let offset = hours_and_minutes(
        "reference_date_delta",
        raw.reference_date_delta_hours,
        raw.reference_date_delta_minutes,
    )?;
    let length = hours_and_minutes(
        "video_length",
        raw.video_length_hours,
        raw.video_length_minutes,
    )?;
    if length < TimeDelta::zero() {
        return Err(ConcatError::config(format!(
            "video_length cannot be negative ({} minutes)",
            length.num_minutes()
        )));
    }
    if length > TimeDelta::hours(MAX_SEARCH_WINDOW_HOURS) {
        return Err(ConcatError::config(format!(
            "video_length of {} hours exceeds the {} hour limit",
            length.num_hours(),
            MAX_SEARCH_WINDOW_HOURS
        )));
    }

    let mut window = SearchWindow::new(raw.strftime_pattern)
        .with_prefix(raw.prefix_pattern)
        .with_suffix(raw.suffix_pattern)
        .with_start_offset(offset)
        .with_length(length);
    if let Some(date) = raw.reference_date {
        let reference = parse_reference_date(&date)?;
        info!("Search reference date: {}", reference);
        window = window.with_reference_instant(reference);
    }
    debug!("Search window: {:?}", window);

    let found = TimeWindowSearcher::new(window).resolve(&raw.dir)?;
    for file in &found {
        info!("  {}", file.display());
    }
    Ok(found)
}

/// `{field}_hours` plus `{field}_minutes` without overflowing
fn hours_and_minutes(field: &str, hours: i64, minutes: i64) -> ConcatResult<TimeDelta> {
    let out_of_range = || {
        ConcatError::config(format!(
            "{}_hours/{}_minutes out of range ({}h {}m)",
            field, field, hours, minutes
        ))
    };
    let hours = TimeDelta::try_hours(hours).ok_or_else(out_of_range)?;
    let minutes = TimeDelta::try_minutes(minutes).ok_or_else(out_of_range)?;
    hours.checked_add(&minutes).ok_or_else(out_of_range)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_comment_lines() {
        let text = "-- header\n{\n  -- indented comments are kept\n}\n--";
        assert_eq!(
            strip_comment_lines(text),
            "{\n  -- indented comments are kept\n}"
        );
    }

    #[test]
    fn test_message_unwraps_config_errors() {
        assert_eq!(message(ConcatError::config("bad")), "bad");
        assert_eq!(message(ConcatError::invalid_input("worse")), "worse");
    }

    #[test]
    fn test_neither_source_is_rejected() {
        assert!(matches!(
            resolve_input_files(None, None),
            Err(ConcatError::Config { .. })
        ));
    }

    #[test]
    fn test_hours_and_minutes_checks_range() {
        assert_eq!(
            hours_and_minutes("video_length", 1, 30).unwrap(),
            TimeDelta::minutes(90)
        );
        assert!(hours_and_minutes("video_length", 9_000_000_000_000, 0).is_err());
        assert!(hours_and_minutes("video_length", 0, i64::MAX).is_err());
        // each part fits, the sum does not
        assert!(hours_and_minutes("video_length", 2_000_000_000_000, 60_000_000_000_000).is_err());
    }

    #[test]
    fn test_non_string_input_file_is_rejected() {
        let result = checked_input_files(vec![serde_json::json!(42)]);
        assert!(matches!(result, Err(ConcatError::Config { .. })));
    }
}
