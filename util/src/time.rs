//! General time utility functions

use std::thread;
use std::time::Duration;

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Block the current thread for the given number of seconds.
///
/// Zero, negative and non-finite durations return immediately.
pub fn sleep_s(seconds: f64) {
    if seconds.is_finite() && seconds > 0.0 {
        thread::sleep(Duration::from_secs_f64(seconds));
    }
}
