//! Metrics backend support: protocol dialects, range translation, legend
//! rendering, and the range-query client.

pub mod client;
pub mod labels;
pub mod protocol;
pub mod range;

pub use client::{MetricMatch, MetricsQueryClient};
pub use protocol::{ApiVersion, MetricSample};
pub use range::{calculate_step, RangeParams, MAX_POINTS_PER_QUERY};
