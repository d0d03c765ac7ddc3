//! Concatenation driver
//!
//! Reads sources one after another into a single sink, emitting only frames
//! read while the source is healthy.

use std::time::Instant;

use image::imageops::{self, FilterType};
use tracing::{debug, info, warn};

use crate::domain::model::Resolution;
use crate::engine::health::{FrameHealthTracker, GrabVerdict};
use crate::engine::{HealthThresholds, SourceOutcome, TimingAccumulator};
use crate::error::ConcatResult;
use crate::ports::{Frame, Interrupt, InterruptSource, VideoSink, VideoSource};
use crate::postprocess::PostProcessSession;

/// Drives sources into one output sink for the duration of a task
pub struct ConcatenationDriver {
    sink: Box<dyn VideoSink>,
    resolution: Resolution,
    skip_frame_count: u32,
    thresholds: HealthThresholds,
    timing: TimingAccumulator,
    total_emitted: u64,
    released: bool,
}

impl ConcatenationDriver {
    /// Take ownership of `sink` for the task
    pub fn new(sink: Box<dyn VideoSink>, resolution: Resolution, skip_frame_count: u32) -> Self {
        Self {
            sink,
            resolution,
            skip_frame_count,
            thresholds: HealthThresholds::default(),
            timing: TimingAccumulator::default(),
            total_emitted: 0,
            released: false,
        }
    }

    pub fn with_thresholds(mut self, thresholds: HealthThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Timing of the frames emitted since the last reset
    pub fn timing(&self) -> &TimingAccumulator {
        &self.timing
    }

    pub fn reset_timing(&mut self) {
        self.timing.reset();
    }

    /// Frames written over the whole task
    pub fn total_emitted(&self) -> u64 {
        self.total_emitted
    }

    /// Append the healthy frames of `source` to the sink.
    ///
    /// Returns when the source reaches its miss threshold or an interrupt is
    /// observed after an emission. Interrupts pending at end of stream are
    /// taken too: a batch abort stops the batch, a file abort is spent on the
    /// file that just ended. The source is not released here.
    pub fn append_source(
        &mut self,
        source: &mut dyn VideoSource,
        session: &mut PostProcessSession<'_>,
        interrupts: &dyn InterruptSource,
    ) -> ConcatResult<SourceOutcome> {
        let mut tracker = FrameHealthTracker::new(self.thresholds);

        loop {
            let iteration_start = Instant::now();

            match tracker.record_grab(source.grab()) {
                GrabVerdict::EndOfStream => {
                    debug!("End of stream after {} failed grabs", tracker.misses());
                    return Ok(match interrupts.poll() {
                        Some(Interrupt::AbortBatch) => {
                            info!("Stopping the batch");
                            SourceOutcome::BatchAborted
                        }
                        Some(Interrupt::AbortFile) => {
                            debug!("File abort requested at end of stream");
                            SourceOutcome::EndOfStream
                        }
                        None => SourceOutcome::EndOfStream,
                    });
                }
                GrabVerdict::Miss { .. } => continue,
                GrabVerdict::Hit { recovered_from, .. } => {
                    if let Some(corrupted) = recovered_from {
                        debug!("Recovered after {} corrupted frames", corrupted);
                    }
                }
            }

            if !tracker.is_stable() {
                continue;
            }

            let frame = match source.retrieve() {
                Some(frame) => frame,
                None => {
                    debug!("Frame retrieval failed, stabilizing again");
                    tracker.reject_retrieval();
                    continue;
                }
            };

            self.emit(frame, session)?;

            for _ in 0..self.skip_frame_count {
                // skipped grabs never count towards health
                source.grab();
            }

            let interrupt = interrupts.poll();
            self.timing.record(iteration_start.elapsed());

            match interrupt {
                Some(Interrupt::AbortFile) => {
                    info!("Skipping the rest of the current file");
                    return Ok(SourceOutcome::FileAborted);
                }
                Some(Interrupt::AbortBatch) => {
                    info!("Stopping the batch");
                    return Ok(SourceOutcome::BatchAborted);
                }
                None => {}
            }
        }
    }

    fn emit(&mut self, frame: Frame, session: &mut PostProcessSession<'_>) -> ConcatResult<()> {
        let target = (self.resolution.width, self.resolution.height);
        let frame = if frame.dimensions() == target {
            frame
        } else {
            imageops::resize(&frame, target.0, target.1, FilterType::Triangle)
        };

        self.sink.write(&frame)?;
        session.process(&frame)?;
        self.total_emitted += 1;
        Ok(())
    }

    /// Release the sink and report the result
    pub fn finish(mut self) -> ConcatResult<()> {
        self.release_sink()
    }

    fn release_sink(&mut self) -> ConcatResult<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        debug!("Releasing sink after {} frames", self.total_emitted);
        self.sink.release()
    }
}

impl Drop for ConcatenationDriver {
    fn drop(&mut self) {
        if let Err(e) = self.release_sink() {
            warn!("Failed to release sink: {}", e);
        }
    }
}
