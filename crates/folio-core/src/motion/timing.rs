//! Progress and interpolation on the host's monotonic clock
//!
//! Times are `Duration`s since page start as reported by the scheduler, so the
//! same inputs always give the same outputs.

use std::time::Duration;

/// Calculate animation progress (0.0 to 1.0)
///
/// # Arguments
/// * `start` - Animation start time
/// * `now` - Current time
/// * `duration` - Total animation duration
///
/// # Returns
/// Progress value clamped to [0.0, 1.0]; a zero duration is always complete
#[inline]
pub fn progress(start: Duration, now: Duration, duration: Duration) -> f64 {
    if duration.is_zero() {
        return 1.0;
    }
    let elapsed = now.saturating_sub(start);
    let ratio = elapsed.as_secs_f64() / duration.as_secs_f64();
    ratio.clamp(0.0, 1.0)
}

/// Check if animation is complete
#[inline]
pub fn is_complete(start: Duration, now: Duration, duration: Duration) -> bool {
    now.saturating_sub(start) >= duration
}

/// Linear interpolation between two values
///
/// # Arguments
/// * `from` - Start value
/// * `to` - End value
/// * `t` - Interpolation factor [0.0, 1.0]
#[inline]
pub fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}
