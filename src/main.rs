//! process_video_task
//!
//! Concatenates hour-segmented camera recordings described by a JSON task
//! file into one stabilized video per task.
//!
//! # Usage
//!
//! ```bash
//! process_video_task tasks.json
//! process_video_task tasks.json --only_info
//! process_video_task tasks.json --log-level debug --json-logs
//! ```
//!
//! Exit codes: 0 success, 1 task failure or no media backend, 2 task file
//! not found, 3 invalid task file, 4 batch aborted with Ctrl-C.

use anyhow::Result;
use clap::Parser;
use tracing::info;

use segment_concat::adapters::init_logging;
use segment_concat::cli::{commands, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.log_level, cli.json_logs);
    info!("Starting process_video_task {}", env!("CARGO_PKG_VERSION"));

    let code = commands::execute(&cli)?;
    info!("Finished with exit code {}", code);
    std::process::exit(code);
}
