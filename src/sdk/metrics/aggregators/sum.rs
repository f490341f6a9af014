use crate::api::metrics::{AtomicNumber, MetricsError, Numeric, Result};
use crate::sdk::export::metrics::{self, Aggregation, AggregationKind, Aggregator};

/// Aggregates values into an arithmetic sum with a single atomic
/// accumulator.
#[derive(Debug, Default)]
pub struct SumAggregator;

/// Storage of the sum aggregator.
#[derive(Debug, Default)]
pub struct SumState<N: Numeric> {
    value: N::Atomic,
}

impl<N: Numeric> SumState<N> {
    /// A state already holding `value`.
    pub fn new(value: N) -> Self {
        SumState {
            value: N::Atomic::new(value),
        }
    }

    /// The current sum.
    pub fn value(&self) -> N {
        self.value.load()
    }
}

impl<N: Numeric> Aggregator<N> for SumAggregator {
    type Storage = SumState<N>;

    fn init(storage: &SumState<N>) {
        storage.value.store(N::default())
    }

    fn update(storage: &SumState<N>, value: N) {
        storage.value.add(value)
    }

    fn synchronized_move(source: &SumState<N>, destination: &SumState<N>) {
        destination.value.store(source.value.swap(N::default()))
    }

    fn reset(storage: &SumState<N>) {
        storage.value.store(N::default())
    }

    fn has_data(storage: &SumState<N>) -> bool {
        storage.value.load() != N::default()
    }

    fn merge(to: &SumState<N>, from: &SumState<N>) {
        to.value.add(from.value.load())
    }

    fn subtract_swap(new_value: &SumState<N>, old_value_modified: &SumState<N>) {
        let delta = new_value.value.load().difference(old_value_modified.value.load());
        old_value_modified.value.store(delta)
    }

    fn aggregation(storage: &SumState<N>) -> Aggregation {
        Aggregation::Sum(metrics::Sum::new(storage.value.load().to_number()))
    }

    fn storage(aggregation: &Aggregation) -> Result<SumState<N>> {
        match aggregation {
            Aggregation::Sum(sum) => Ok(SumState::new(N::from_number(sum.sum()))),
            other => Err(MetricsError::InconsistentAggregator(format!(
                "expected {:?}, got {:?}",
                AggregationKind::Sum,
                other.kind()
            ))),
        }
    }
}
