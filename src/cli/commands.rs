//! Command implementations

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::adapters::{default_backend, CtrlCInterrupts, JsonConfigAdapter};
use crate::cli::Cli;
use crate::domain::model::TaskConfig;
use crate::engine::{BatchReport, TaskOrchestrator};
use crate::error::ConcatError;
use crate::ports::{InterruptSource, NoInterrupts};
use crate::postprocess::PostProcessorRegistry;

/// Process exit codes
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    /// A task failed or no media backend is available
    pub const FAILURE: i32 = 1;
    pub const CONFIG_NOT_FOUND: i32 = 2;
    pub const CONFIG_INVALID: i32 = 3;
    pub const ABORTED: i32 = 4;
}

/// Run the command line and return the process exit code
pub fn execute(cli: &Cli) -> Result<i32> {
    info!("Task file: {}", cli.config_file.display());

    let tasks = match JsonConfigAdapter::new().load_tasks(&cli.config_file) {
        Ok(tasks) => tasks,
        Err(e) => {
            error!("{}", e);
            return Ok(config_exit_code(&e));
        }
    };

    print_tasks(&tasks);
    if cli.only_info {
        return Ok(exit_code::SUCCESS);
    }

    let backend = match default_backend() {
        Ok(backend) => backend,
        Err(e) => {
            error!("{}", e);
            return Ok(exit_code::FAILURE);
        }
    };

    let interrupts: Box<dyn InterruptSource> = match CtrlCInterrupts::install() {
        Ok(interrupts) => Box::new(interrupts),
        Err(e) => {
            warn!("{}; interrupts are disabled", e);
            Box::new(NoInterrupts)
        }
    };

    let mut orchestrator =
        TaskOrchestrator::new(backend, PostProcessorRegistry::new(), interrupts);
    let report = orchestrator.run_batch(&tasks);

    if cli.json_report {
        let json =
            serde_json::to_string_pretty(&report).context("Failed to serialize batch report")?;
        println!("{}", json);
    }

    Ok(batch_exit_code(&report))
}

fn print_tasks(tasks: &[TaskConfig]) {
    for task in tasks {
        let state = if task.is_runnable() {
            "runnable"
        } else {
            "not runnable"
        };
        println!("{} [{}]", task, state);
    }
}

/// Exit code for a task file that could not be loaded
pub fn config_exit_code(error: &ConcatError) -> i32 {
    match error {
        ConcatError::ConfigNotFound { .. } => exit_code::CONFIG_NOT_FOUND,
        _ => exit_code::CONFIG_INVALID,
    }
}

/// Exit code for a finished batch; an abort wins over failures
pub fn batch_exit_code(report: &BatchReport) -> i32 {
    if report.aborted {
        exit_code::ABORTED
    } else if report.has_failures() {
        exit_code::FAILURE
    } else {
        exit_code::SUCCESS
    }
}
