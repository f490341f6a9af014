//! Exported aggregation views
use crate::api::metrics::Number;

/// The kinds of aggregation an instrument may export.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AggregationKind {
    /// An arithmetic sum of every value recorded.
    Sum,
    /// The most recent value recorded.
    LastValue,
}

/// A read-only copy of an aggregator's storage, handed to exporters.
///
/// Exporters match on the variant to learn the shape of the statistic; the
/// number kind comes from the instrument's descriptor.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub enum Aggregation {
    /// An aggregated sum.
    Sum(Sum),
    /// The latest value that was aggregated.
    LastValue(LastValue),
}

impl Aggregation {
    /// The kind of this aggregation.
    pub fn kind(&self) -> AggregationKind {
        match self {
            Aggregation::Sum(_) => AggregationKind::Sum,
            Aggregation::LastValue(_) => AggregationKind::LastValue,
        }
    }

    /// The sum view of this aggregation, if it is one.
    pub fn as_sum(&self) -> Option<&Sum> {
        match self {
            Aggregation::Sum(sum) => Some(sum),
            _ => None,
        }
    }

    /// The last value view of this aggregation, if it is one.
    pub fn as_last_value(&self) -> Option<&LastValue> {
        match self {
            Aggregation::LastValue(last) => Some(last),
            _ => None,
        }
    }
}

/// Sum returns an aggregated sum.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sum {
    sum: Number,
}

impl Sum {
    /// Wrap a sum value.
    pub fn new(sum: Number) -> Self {
        Sum { sum }
    }

    /// The aggregated sum.
    pub fn sum(&self) -> Number {
        self.sum
    }
}

/// LastValue returns the latest value that was aggregated.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LastValue {
    value: Number,
}

impl LastValue {
    /// Wrap a last value.
    pub fn new(value: Number) -> Self {
        LastValue { value }
    }

    /// The latest value.
    pub fn last_value(&self) -> Number {
        self.value
    }
}
