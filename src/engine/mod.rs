//! Core concatenation engine module

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub mod concatenator;
pub mod health;
pub mod orchestrator;

pub use concatenator::ConcatenationDriver;
pub use health::{FrameHealthTracker, GrabVerdict, HealthState};
pub use orchestrator::{BatchReport, TaskOrchestrator, TaskReport, TaskStatus};

/// Consecutive successful grabs before a retrieved frame is trusted
pub const STABILIZATION_THRESHOLD: u32 = 100;

/// Consecutive failed grabs treated as end of stream
pub const EOF_MISS_THRESHOLD: u32 = 150;

/// Health thresholds used by [`FrameHealthTracker`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthThresholds {
    /// Hit streak required before retrieval
    pub stabilization: u32,
    /// Miss streak that ends a source
    pub eof_misses: u32,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            stabilization: STABILIZATION_THRESHOLD,
            eof_misses: EOF_MISS_THRESHOLD,
        }
    }
}

/// Why a source stopped being read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceOutcome {
    /// Miss threshold reached
    EndOfStream,
    /// User asked to skip the rest of this file
    FileAborted,
    /// User asked to stop the whole batch
    BatchAborted,
}

/// Per-file frame timing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimingAccumulator {
    /// Wall time spent in emitting iterations
    pub total_elapsed: Duration,
    /// Frames emitted
    pub emitted_count: u64,
}

impl TimingAccumulator {
    pub fn record(&mut self, elapsed: Duration) {
        self.total_elapsed += elapsed;
        self.emitted_count += 1;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Average time per emitted frame, `None` before the first emission
    pub fn average(&self) -> Option<Duration> {
        if self.emitted_count == 0 {
            return None;
        }
        let nanos = self.total_elapsed.as_nanos() / u128::from(self.emitted_count);
        Some(Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timing_average() {
        let mut timing = TimingAccumulator::default();
        assert_eq!(timing.average(), None);

        timing.record(Duration::from_millis(10));
        timing.record(Duration::from_millis(20));
        assert_eq!(timing.emitted_count, 2);
        assert_eq!(timing.average(), Some(Duration::from_millis(15)));

        timing.reset();
        assert_eq!(timing, TimingAccumulator::default());
    }

    #[test]
    fn test_default_thresholds() {
        let thresholds = HealthThresholds::default();
        assert_eq!(thresholds.stabilization, 100);
        assert_eq!(thresholds.eof_misses, 150);
    }
}
