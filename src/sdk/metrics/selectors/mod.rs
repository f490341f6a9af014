//! Metric Selectors
//!
//! Decide which aggregator backs an instrument.
use crate::api::metrics::Descriptor;
use std::fmt;

pub mod simple;

/// The aggregation chosen for one instrument.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Aggregate {
    /// Aggregate with `SumAggregator`.
    Sum,
    /// Aggregate with `LastValueAggregator`.
    LastValue,
    /// Record nothing and export nothing.
    Drop,
}

/// AggregationSelector is responsible for selecting the concrete type of
/// aggregator used for an instrument that no view matched.
///
/// The same choice must be returned for equal descriptors: instruments are
/// deduplicated by descriptor and an existing instrument keeps the
/// aggregator it was created with.
pub trait AggregationSelector: fmt::Debug + Send + Sync {
    /// The aggregation for instruments described by `descriptor`.
    fn aggregator_for(&self, descriptor: &Descriptor) -> Aggregate;
}
