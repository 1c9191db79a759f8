//! Shared query and result types for both backend paths.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// A single query target collected from a dashboard panel.
///
/// Owned transiently per query call; the core never persists targets.
/// Expression text is expected to already have dashboard variables
/// substituted by the host before it reaches this crate.
#[derive(Debug, Clone, Default)]
pub struct QueryTarget {
    /// Backend query expression. Targets with an empty expression are
    /// skipped without issuing a request.
    pub expr: String,
    /// Hidden targets are skipped without issuing a request.
    pub hide: bool,
    /// Requested sampling interval. Falls back to the panel-scoped
    /// interval when absent.
    pub interval: Option<Duration>,
    /// Multiplier applied to the sampling interval. Defaults to 1.
    pub interval_factor: Option<u32>,
    /// Display-name template applied to each resulting series' label set.
    pub legend_format: Option<String>,
}

impl QueryTarget {
    /// Convenience constructor for a visible target with default interval
    /// settings.
    #[must_use]
    pub fn new(expr: impl Into<String>) -> Self {
        Self { expr: expr.into(), ..Self::default() }
    }
}

/// An absolute `[from, to)` query window in backend epoch seconds.
///
/// Invariant: `to >= from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub from: i64,
    pub to: i64,
}

impl TimeRange {
    /// Creates a range from epoch-second bounds.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if `to < from`.
    #[must_use]
    pub fn new(from: i64, to: i64) -> Self {
        debug_assert!(to >= from, "Invalid TimeRange: to ({to}) < from ({from})");
        Self { from, to }
    }

    /// Creates a range from instants, resolved to whole epoch seconds.
    #[must_use]
    pub fn from_instants(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self::new(from.timestamp(), to.timestamp())
    }

    /// Range duration in whole seconds.
    #[must_use]
    pub fn duration_secs(&self) -> i64 {
        self.to.saturating_sub(self.from)
    }
}

/// A normalized series: a display label plus `(value, timestamp-millis)`
/// points in backend response order.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    pub target: String,
    pub datapoints: Vec<(f64, i64)>,
}
