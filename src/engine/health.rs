//! Frame health tracking
//!
//! Damaged recordings produce runs of undecodable frames. A source is only
//! trusted after a long streak of clean grabs, and a long streak of failures
//! is taken as the end of the file.

use serde::{Deserialize, Serialize};

use crate::engine::HealthThresholds;

/// Observable tracker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthState {
    Init,
    AccumulatingMisses,
    AccumulatingHits,
    Stable,
    Eof,
}

/// Result of recording one grab
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrabVerdict {
    /// Grab failed; `streak` consecutive misses so far
    Miss { streak: u32 },
    /// Grab succeeded; `recovered_from` is the miss streak it ended, if any
    Hit { streak: u32, recovered_from: Option<u32> },
    /// Miss threshold reached
    EndOfStream,
}

/// Hit/miss counters for one source
#[derive(Debug, Clone)]
pub struct FrameHealthTracker {
    thresholds: HealthThresholds,
    hits: u32,
    misses: u32,
    started: bool,
    eof: bool,
}

impl FrameHealthTracker {
    pub fn new(thresholds: HealthThresholds) -> Self {
        Self {
            thresholds,
            hits: 0,
            misses: 0,
            started: false,
            eof: false,
        }
    }

    pub fn hits(&self) -> u32 {
        self.hits
    }

    pub fn misses(&self) -> u32 {
        self.misses
    }

    /// Record the result of a health-relevant grab
    pub fn record_grab(&mut self, ok: bool) -> GrabVerdict {
        self.started = true;
        if ok {
            let recovered_from = (self.misses > 0).then_some(self.misses);
            self.hits = self.hits.saturating_add(1);
            self.misses = 0;
            GrabVerdict::Hit {
                streak: self.hits,
                recovered_from,
            }
        } else {
            self.hits = 0;
            self.misses = self.misses.saturating_add(1);
            if self.misses >= self.thresholds.eof_misses {
                self.eof = true;
                GrabVerdict::EndOfStream
            } else {
                GrabVerdict::Miss {
                    streak: self.misses,
                }
            }
        }
    }

    /// True once the hit streak reaches the stabilization threshold
    pub fn is_stable(&self) -> bool {
        !self.eof && self.hits >= self.thresholds.stabilization
    }

    /// A stable grab could not be converted; start stabilizing again.
    /// The miss streak is left untouched.
    pub fn reject_retrieval(&mut self) {
        self.hits = 0;
    }

    pub fn state(&self) -> HealthState {
        if self.eof {
            HealthState::Eof
        } else if self.is_stable() {
            HealthState::Stable
        } else if self.hits > 0 {
            HealthState::AccumulatingHits
        } else if self.misses > 0 {
            HealthState::AccumulatingMisses
        } else if self.started {
            // retrieval was rejected right after a clean streak
            HealthState::AccumulatingHits
        } else {
            HealthState::Init
        }
    }
}

impl Default for FrameHealthTracker {
    fn default() -> Self {
        Self::new(HealthThresholds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let tracker = FrameHealthTracker::default();
        assert_eq!(tracker.state(), HealthState::Init);
        assert!(!tracker.is_stable());
    }

    #[test]
    fn test_149_misses_then_hit_is_not_eof() {
        let mut tracker = FrameHealthTracker::default();
        for _ in 0..149 {
            assert!(matches!(tracker.record_grab(false), GrabVerdict::Miss { .. }));
        }
        assert_eq!(tracker.state(), HealthState::AccumulatingMisses);
        assert_eq!(
            tracker.record_grab(true),
            GrabVerdict::Hit {
                streak: 1,
                recovered_from: Some(149)
            }
        );
        assert_eq!(tracker.misses(), 0);
    }

    #[test]
    fn test_150_misses_is_eof() {
        let mut tracker = FrameHealthTracker::default();
        for _ in 0..149 {
            tracker.record_grab(false);
        }
        assert_eq!(tracker.record_grab(false), GrabVerdict::EndOfStream);
        assert_eq!(tracker.state(), HealthState::Eof);
    }

    #[test]
    fn test_99_hits_then_miss_never_stabilizes() {
        let mut tracker = FrameHealthTracker::default();
        for _ in 0..99 {
            tracker.record_grab(true);
            assert!(!tracker.is_stable());
        }
        tracker.record_grab(false);
        assert_eq!(tracker.hits(), 0);
        assert!(!tracker.is_stable());
    }

    #[test]
    fn test_100_hits_is_stable() {
        let mut tracker = FrameHealthTracker::default();
        for _ in 0..100 {
            tracker.record_grab(true);
        }
        assert!(tracker.is_stable());
        assert_eq!(tracker.state(), HealthState::Stable);
    }

    #[test]
    fn test_rejected_retrieval_resets_hits_only() {
        let mut tracker = FrameHealthTracker::default();
        tracker.record_grab(false);
        tracker.record_grab(false);
        for _ in 0..100 {
            tracker.record_grab(true);
        }
        tracker.reject_retrieval();
        assert_eq!(tracker.hits(), 0);
        assert_eq!(tracker.misses(), 0);
        assert!(!tracker.is_stable());
        assert_eq!(tracker.state(), HealthState::AccumulatingHits);
    }

    #[test]
    fn test_custom_thresholds() {
        let mut tracker = FrameHealthTracker::new(HealthThresholds {
            stabilization: 2,
            eof_misses: 3,
        });
        tracker.record_grab(true);
        tracker.record_grab(true);
        assert!(tracker.is_stable());
        tracker.record_grab(false);
        tracker.record_grab(false);
        assert_eq!(tracker.record_grab(false), GrabVerdict::EndOfStream);
    }
}
