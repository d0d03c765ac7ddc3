//! Time-windowed discovery of recorded segments
//!
//! Camera recorders name files after the hour they started (for example
//! `2022081214*.h264`) while the exact minute and second suffix is unknown.
//! The searcher probes every minute of the window with a wildcard-tolerant
//! glob, so each file is found regardless of its suffix. One file matching
//! many probes is reported once, at the first probe that saw it.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{Duration, Local, NaiveDateTime};
use glob::Pattern;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{ConcatError, ConcatResult};
use crate::utils::time::{format_timestamp, validate_strftime};

/// Search parameters for one camera directory
#[derive(Debug, Clone, PartialEq)]
pub struct SearchWindow {
    /// Glob fragment placed before the formatted timestamp
    pub prefix_pattern: String,
    /// Glob fragment placed after the formatted timestamp
    pub suffix_pattern: String,
    /// strftime pattern used to render each probe time
    pub time_format: String,
    /// Point the window offset is measured from; local now when unset
    pub reference_instant: Option<NaiveDateTime>,
    /// How far before the reference instant the window starts
    pub window_start_offset: Duration,
    /// Window length; only whole minutes are probed
    pub window_length: Duration,
}

impl SearchWindow {
    /// Create a window with empty glob fragments and zero length
    pub fn new(time_format: impl Into<String>) -> Self {
        Self {
            prefix_pattern: String::new(),
            suffix_pattern: String::new(),
            time_format: time_format.into(),
            reference_instant: None,
            window_start_offset: Duration::zero(),
            window_length: Duration::zero(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix_pattern = prefix.into();
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix_pattern = suffix.into();
        self
    }

    pub fn with_reference_instant(mut self, instant: NaiveDateTime) -> Self {
        self.reference_instant = Some(instant);
        self
    }

    pub fn with_start_offset(mut self, offset: Duration) -> Self {
        self.window_start_offset = offset;
        self
    }

    pub fn with_length(mut self, length: Duration) -> Self {
        self.window_length = length;
        self
    }
}

/// Resolves a [`SearchWindow`] against a directory
#[derive(Debug, Clone)]
pub struct TimeWindowSearcher {
    window: SearchWindow,
}

impl TimeWindowSearcher {
    pub fn new(window: SearchWindow) -> Self {
        Self { window }
    }

    pub fn window(&self) -> &SearchWindow {
        &self.window
    }

    /// Glob used for a single probe time
    pub fn probe_pattern(&self, probe: &NaiveDateTime) -> ConcatResult<String> {
        let stamp = format_timestamp(probe, &self.window.time_format)?;
        Ok(format!(
            "{}{}{}",
            self.window.prefix_pattern, stamp, self.window.suffix_pattern
        ))
    }

    /// Find the files of the window inside `directory`.
    ///
    /// Results are ordered by probe minute, then lexicographically, without
    /// duplicates. An empty window or a directory without matches yields an
    /// empty list.
    pub fn resolve(&self, directory: &Path) -> ConcatResult<Vec<PathBuf>> {
        if !directory.is_dir() {
            return Err(ConcatError::invalid_input(format!(
                "Search directory does not exist: {}",
                directory.display()
            )));
        }
        validate_strftime(&self.window.time_format)?;

        let reference = self
            .window
            .reference_instant
            .unwrap_or_else(|| Local::now().naive_local());
        let window_begin = reference
            .checked_sub_signed(self.window.window_start_offset)
            .ok_or_else(|| {
                ConcatError::invalid_input(format!(
                    "Window start offset {} moves {} out of range",
                    self.window.window_start_offset, reference
                ))
            })?;
        let total_minutes = self.window.window_length.num_minutes();

        info!(
            "Searching {} from {} for {} minutes",
            directory.display(),
            window_begin,
            total_minutes.max(0)
        );

        if total_minutes <= 0 {
            return Ok(Vec::new());
        }

        let entries = list_files(directory)?;
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut found = Vec::new();

        for minute in 0..total_minutes {
            let probe = window_begin
                .checked_add_signed(Duration::minutes(minute))
                .ok_or_else(|| {
                    ConcatError::invalid_input(format!(
                        "Probe time out of range at minute {}",
                        minute
                    ))
                })?;
            let pattern_text = self.probe_pattern(&probe)?;
            let pattern = Pattern::new(&pattern_text).map_err(|e| {
                ConcatError::invalid_input(format!("Invalid glob '{}': {}", pattern_text, e))
            })?;

            let mut matches: Vec<&PathBuf> = entries
                .iter()
                .filter(|(name, _)| pattern.matches(name))
                .map(|(_, path)| path)
                .collect();
            matches.sort();

            for path in matches {
                if seen.insert(path.clone()) {
                    debug!("Found {} (probe {})", path.display(), pattern_text);
                    found.push(path.clone());
                }
            }
        }

        info!("Found {} files in {}", found.len(), directory.display());
        Ok(found)
    }
}

/// Regular files directly inside `directory`, keyed by file name
fn list_files(directory: &Path) -> ConcatResult<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(directory).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            ConcatError::invalid_input(format!(
                "Failed to list {}: {}",
                directory.display(),
                e
            ))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        files.push((name, entry.into_path()));
    }
    Ok(files)
}
