//! Common utilities and helpers

use std::time::Duration;

pub mod time;

/// Utility functions for reporting
pub struct Utils;

impl Utils {
    /// Format duration for display
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;
        let milliseconds = duration.subsec_millis();

        if hours > 0 {
            format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, milliseconds)
        } else {
            format!("{:02}:{:02}.{:03}", minutes, seconds, milliseconds)
        }
    }

    /// Format a per-frame time with millisecond precision
    pub fn format_frame_time(duration: Option<Duration>) -> String {
        match duration {
            Some(duration) => format!("{:.3} ms", duration.as_secs_f64() * 1000.0),
            None => "n/a".to_string(),
        }
    }
}
