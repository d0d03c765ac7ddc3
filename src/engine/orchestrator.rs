//! Batch execution of concatenation tasks

use std::path::PathBuf;
use std::rc::Rc;
use std::time::Instant;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::domain::model::TaskConfig;
use crate::engine::concatenator::ConcatenationDriver;
use crate::engine::{HealthThresholds, SourceOutcome};
use crate::error::ConcatResult;
use crate::ports::{InterruptSource, MediaBackend, SinkSettings};
use crate::postprocess::{
    DetectionPostProcessor, DetectorFactory, FramePostProcessor, PostProcessorRegistry,
};
use crate::utils::Utils;

/// Final state of one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Completed,
    Skipped { reason: String },
    Failed { error: String },
    Aborted,
}

/// Outcome of one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskReport {
    /// Output written by the task, when it got that far
    pub output_path: Option<PathBuf>,
    pub status: TaskStatus,
    /// Input files read to the end or until an interrupt
    pub files_processed: usize,
    /// Input files that could not be opened
    pub files_skipped: usize,
    pub frames_written: u64,
}

impl TaskReport {
    fn new(status: TaskStatus) -> Self {
        Self {
            output_path: None,
            status,
            files_processed: 0,
            files_skipped: 0,
            frames_written: 0,
        }
    }
}

/// Outcome of a batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub tasks: Vec<TaskReport>,
    /// The user stopped the batch; tasks after the aborted one were not run
    pub aborted: bool,
}

impl BatchReport {
    pub fn completed_count(&self) -> usize {
        self.count(|s| matches!(s, TaskStatus::Completed))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|s| matches!(s, TaskStatus::Skipped { .. }))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|s| matches!(s, TaskStatus::Failed { .. }))
    }

    pub fn has_failures(&self) -> bool {
        self.failed_count() > 0
    }

    fn count(&self, predicate: impl Fn(&TaskStatus) -> bool) -> usize {
        self.tasks.iter().filter(|t| predicate(&t.status)).count()
    }
}

/// Progress of a task's input files
#[derive(Debug, Default)]
struct FileProgress {
    processed: usize,
    skipped: usize,
    aborted: bool,
}

/// Runs tasks one after another against a media backend
pub struct TaskOrchestrator {
    backend: Rc<dyn MediaBackend>,
    registry: PostProcessorRegistry,
    interrupts: Box<dyn InterruptSource>,
    thresholds: HealthThresholds,
    detectors: Option<DetectorFactory>,
}

impl TaskOrchestrator {
    pub fn new(
        backend: Box<dyn MediaBackend>,
        registry: PostProcessorRegistry,
        interrupts: Box<dyn InterruptSource>,
    ) -> Self {
        Self {
            backend: Rc::from(backend),
            registry,
            interrupts,
            thresholds: HealthThresholds::default(),
            detectors: None,
        }
    }

    pub fn with_thresholds(mut self, thresholds: HealthThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Detectors for tasks that ask for a detection video.
    ///
    /// Without a factory such tasks still run, without the detection video.
    pub fn with_detector_factory(mut self, factory: DetectorFactory) -> Self {
        self.detectors = Some(factory);
        self
    }

    /// Run every task in order until the batch completes or is aborted
    pub fn run_batch(&mut self, tasks: &[TaskConfig]) -> BatchReport {
        let batch_start = Instant::now();
        let mut report = BatchReport::default();

        info!(
            "Starting batch of {} tasks with backend {}",
            tasks.len(),
            self.backend.name()
        );

        for (index, task) in tasks.iter().enumerate() {
            info!("Task {}/{}: {}", index + 1, tasks.len(), task);
            let task_report = self.run_task(task);
            let aborted = task_report.status == TaskStatus::Aborted;
            report.tasks.push(task_report);

            if aborted {
                warn!(
                    "Batch aborted by user, {} tasks not run",
                    tasks.len() - index - 1
                );
                report.aborted = true;
                break;
            }
        }

        info!(
            "Batch finished in {}: {} completed, {} skipped, {} failed",
            Utils::format_duration(batch_start.elapsed()),
            report.completed_count(),
            report.skipped_count(),
            report.failed_count()
        );
        report
    }

    fn run_task(&mut self, task: &TaskConfig) -> TaskReport {
        if !task.is_runnable() {
            let reason = match task.output_path_template() {
                Some(path) => format!("output directory of {} does not exist", path.display()),
                None => "output path is not set".to_string(),
            };
            warn!("Skipping task: {}", reason);
            return TaskReport::new(TaskStatus::Skipped { reason });
        }

        let started = Local::now().naive_local();
        let output_path = match task.actual_output_path(started) {
            Ok(path) => path,
            Err(e) => return failed(None, e.to_string()),
        };
        let detection = match self.detection_processor(task, started) {
            Ok(detection) => detection,
            Err(e) => return failed(Some(output_path), e.to_string()),
        };

        let settings = SinkSettings {
            path: output_path.clone(),
            codec: task.output_codec().to_string(),
            fps: task.output_fps(),
            resolution: task.resolution(),
        };
        let sink = match self.backend.open_sink(&settings) {
            Ok(sink) => sink,
            Err(e) => return failed(Some(output_path), e.to_string()),
        };
        info!("Writing {}", output_path.display());

        let mut driver =
            ConcatenationDriver::new(sink, task.resolution(), task.skip_frame_count())
                .with_thresholds(self.thresholds);

        // the detection processor lives for this task only
        let shared = self.registry.len();
        if let Some(processor) = detection {
            self.registry.register_boxed(processor);
        }
        let result = concatenate(
            self.backend.as_ref(),
            &mut self.registry,
            self.interrupts.as_ref(),
            task,
            &mut driver,
        );
        self.registry.truncate(shared);
        let frames_written = driver.total_emitted();
        let released = driver.finish();

        let mut report = TaskReport::new(TaskStatus::Completed);
        report.output_path = Some(output_path);
        report.frames_written = frames_written;

        let outcome = match (result, released) {
            (Ok(progress), Ok(())) => Ok(progress),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), released) => {
                if let Err(release_error) = released {
                    warn!("Failed to release output: {}", release_error);
                }
                Err(e)
            }
        };

        let progress = match outcome {
            Ok(progress) => progress,
            Err(e) => {
                error!("Task failed: {}", e);
                report.status = TaskStatus::Failed {
                    error: e.to_string(),
                };
                return report;
            }
        };

        report.files_processed = progress.processed;
        report.files_skipped = progress.skipped;
        if progress.aborted {
            report.status = TaskStatus::Aborted;
        }
        info!(
            "Task finished: {} frames from {} files ({} skipped)",
            report.frames_written, report.files_processed, report.files_skipped
        );
        report
    }

    fn detection_processor(
        &mut self,
        task: &TaskConfig,
        started: NaiveDateTime,
    ) -> ConcatResult<Option<Box<dyn FramePostProcessor>>> {
        let path = match task.actual_object_detection_path(started)? {
            Some(path) => path,
            None => return Ok(None),
        };
        let factory = match self.detectors.as_mut() {
            Some(factory) => factory,
            None => {
                warn!(
                    "No object detector available, {} will not be written",
                    path.display()
                );
                return Ok(None);
            }
        };

        let detector = factory()?;
        info!("Detection video: {}", path.display());
        let processor: Box<dyn FramePostProcessor> = Box::new(DetectionPostProcessor::new(
            detector,
            Rc::clone(&self.backend),
            path,
        ));
        Ok(Some(processor))
    }
}

fn failed(output_path: Option<PathBuf>, error: String) -> TaskReport {
    error!("Task failed: {}", error);
    let mut report = TaskReport::new(TaskStatus::Failed { error });
    report.output_path = output_path;
    report
}

/// Feed every input file of `task` through the driver.
///
/// The post-processor session lives only inside this call, so it is always
/// ended before the caller releases the sink.
fn concatenate(
    backend: &dyn MediaBackend,
    registry: &mut PostProcessorRegistry,
    interrupts: &dyn InterruptSource,
    task: &TaskConfig,
    driver: &mut ConcatenationDriver,
) -> ConcatResult<FileProgress> {
    let mut session = registry.begin(task.resolution())?;
    let mut progress = FileProgress::default();

    for path in task.input_files() {
        let mut source = match backend.open_source(path) {
            Ok(source) => source,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                progress.skipped += 1;
                continue;
            }
        };

        info!("Processing {}", path.display());
        let outcome = driver.append_source(source.as_mut(), &mut session, interrupts);
        source.release();
        let outcome = outcome?;

        let timing = driver.timing();
        info!(
            "{}: {} frames, {} per frame",
            path.display(),
            timing.emitted_count,
            Utils::format_frame_time(timing.average())
        );
        driver.reset_timing();
        progress.processed += 1;

        if outcome == SourceOutcome::BatchAborted {
            progress.aborted = true;
            break;
        }
    }

    session.finish()?;
    Ok(progress)
}
