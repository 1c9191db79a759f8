//! Translation of abstract time windows into backend range parameters.

use std::time::Duration;

use crate::types::TimeRange;

/// Point-count ceiling enforced by the metrics backend. Range queries whose
/// `(end - start) / step` exceeds this are rejected outright, so the step is
/// recalibrated client-side to keep every issued query valid.
pub const MAX_POINTS_PER_QUERY: i64 = 11_000;

/// Backend-native range parameters in epoch seconds.
///
/// Both protocol dialects are derived from the same triple: the legacy
/// dialect sends `start`/`end` absolutes, the newer one sends
/// `range = end - start` plus `end`. The step cap is applied against the
/// same `(end - start)` value in both cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeParams {
    pub start: i64,
    pub end: i64,
    pub step: u64,
}

impl RangeParams {
    /// Builds range parameters from a resolved time window and a requested
    /// step, applying the point-count cap.
    #[must_use]
    pub fn new(range: TimeRange, step: u64) -> Self {
        let calibrated = calibrate_step(range.duration_secs(), step);
        Self { start: range.from, end: range.to, step: calibrated }
    }

    /// Range duration in whole seconds.
    #[must_use]
    pub fn range_secs(&self) -> i64 {
        self.end.saturating_sub(self.start)
    }
}

/// Computes the requested step from a sampling interval and factor:
/// whole seconds of the interval (minimum 1) times the factor.
#[must_use]
pub fn calculate_step(interval: Duration, interval_factor: u32) -> u64 {
    interval.as_secs().max(1) * u64::from(interval_factor)
}

/// Downward-adjusts a step that would exceed the backend's point ceiling.
///
/// Leaves the step untouched when `range_secs / step <= 11000`; otherwise
/// returns `floor(range_secs / 11000)`.
#[must_use]
pub fn calibrate_step(range_secs: i64, step: u64) -> u64 {
    if step == 0 {
        return step;
    }
    // range / step > 11000, compared without integer-division truncation.
    let exceeds = range_secs > MAX_POINTS_PER_QUERY.saturating_mul(step as i64);
    if exceeds {
        (range_secs / MAX_POINTS_PER_QUERY) as u64
    } else {
        step
    }
}
