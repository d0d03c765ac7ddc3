//! CLI module for segment concatenation
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::Parser;

use crate::adapters::LogLevel;

pub mod commands;

/// Concatenates hour-segmented camera recordings described by a JSON task file
#[derive(Parser, Debug)]
#[command(name = "process_video_task")]
#[command(about = "Concatenate camera recording segments into one stabilized video")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// JSON task file
    pub config_file: PathBuf,

    /// Print the tasks and whether they can run, then exit
    #[arg(short = 'i', long = "only_info")]
    pub only_info: bool,

    /// Logging level (overridden by RUST_LOG)
    #[arg(long, default_value = "info", env = "SEGMENT_CONCAT_LOG_LEVEL")]
    pub log_level: LogLevel,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Print the batch report as JSON on stdout when the batch ends
    #[arg(long)]
    pub json_report: bool,
}
