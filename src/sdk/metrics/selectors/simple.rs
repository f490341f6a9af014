//! Simple Metric Selectors
use crate::api::metrics::{Descriptor, InstrumentKind};
use crate::sdk::metrics::selectors::{Aggregate, AggregationSelector};

/// The default selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selector {
    /// Sums for every counter and up-down counter, last value for gauges.
    Inexpensive,
    /// Sums for every instrument, gauges included.
    Sum,
}

impl Default for Selector {
    fn default() -> Self {
        Selector::Inexpensive
    }
}

impl AggregationSelector for Selector {
    fn aggregator_for(&self, descriptor: &Descriptor) -> Aggregate {
        match (self, descriptor.instrument_kind()) {
            (Selector::Inexpensive, InstrumentKind::ObservableGauge) => Aggregate::LastValue,
            _ => Aggregate::Sum,
        }
    }
}
