//! Metric Aggregators

mod last_value;
mod sum;

pub use last_value::{LastValueAggregator, LastValueState};
pub use sum::{SumAggregator, SumState};
