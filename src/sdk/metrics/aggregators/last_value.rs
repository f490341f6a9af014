use crate::api::metrics::{MetricsError, Numeric, Result};
use crate::sdk::export::metrics::{self, Aggregation, AggregationKind, Aggregator};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Aggregates values by keeping the most recent one.
#[derive(Debug, Default)]
pub struct LastValueAggregator;

/// Storage of the last value aggregator.
#[derive(Debug, Default)]
pub struct LastValueState<N> {
    current: Mutex<Option<N>>,
}

impl<N: Numeric> LastValueState<N> {
    /// A state already holding `value`.
    pub fn new(value: N) -> Self {
        LastValueState {
            current: Mutex::new(Some(value)),
        }
    }

    /// The held value, if any was recorded since the last harvest.
    pub fn value(&self) -> Option<N> {
        *self.lock()
    }

    // The guarded value is a plain Option, a panicking holder cannot leave
    // it half-written.
    fn lock(&self) -> MutexGuard<'_, Option<N>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<N: Numeric> Aggregator<N> for LastValueAggregator {
    type Storage = LastValueState<N>;

    fn init(storage: &LastValueState<N>) {
        *storage.lock() = None;
    }

    fn update(storage: &LastValueState<N>, value: N) {
        *storage.lock() = Some(value);
    }

    fn synchronized_move(source: &LastValueState<N>, destination: &LastValueState<N>) {
        let moved = source.lock().take();
        *destination.lock() = moved;
    }

    fn reset(storage: &LastValueState<N>) {
        *storage.lock() = None;
    }

    fn has_data(storage: &LastValueState<N>) -> bool {
        storage.lock().is_some()
    }

    fn merge(to: &LastValueState<N>, from: &LastValueState<N>) {
        // `from` always holds the newer observation
        if let Some(value) = *from.lock() {
            *to.lock() = Some(value);
        }
    }

    fn subtract_swap(new_value: &LastValueState<N>, old_value_modified: &LastValueState<N>) {
        // gauges are not differenced
        let latest = *new_value.lock();
        *old_value_modified.lock() = latest;
    }

    fn aggregation(storage: &LastValueState<N>) -> Aggregation {
        let value = storage.lock().unwrap_or_default();
        Aggregation::LastValue(metrics::LastValue::new(value.to_number()))
    }

    fn storage(aggregation: &Aggregation) -> Result<LastValueState<N>> {
        match aggregation {
            Aggregation::LastValue(last) => {
                Ok(LastValueState::new(N::from_number(last.last_value())))
            }
            other => Err(MetricsError::InconsistentAggregator(format!(
                "expected {:?}, got {:?}",
                AggregationKind::LastValue,
                other.kind()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type LastValue = LastValueAggregator;

    #[test]
    fn last_write_wins() {
        let current = LastValueState::<f64>::default();
        <LastValue as Aggregator<f64>>::update(&current, 1.0);
        <LastValue as Aggregator<f64>>::update(&current, 7.5);
        assert_eq!(current.value(), Some(7.5));
    }

    #[test]
    fn move_empties_source() {
        let current = LastValueState::<i64>::default();
        let checkpoint = LastValueState::<i64>::default();
        assert!(!<LastValue as Aggregator<i64>>::has_data(&current));

        <LastValue as Aggregator<i64>>::update(&current, 0);
        assert!(<LastValue as Aggregator<i64>>::has_data(&current));

        <LastValue as Aggregator<i64>>::synchronized_move(&current, &checkpoint);
        assert_eq!(checkpoint.value(), Some(0));
        assert!(!<LastValue as Aggregator<i64>>::has_data(&current));
    }

    #[test]
    fn merge_keeps_newer_value() {
        let to = LastValueState::new(1i64);
        <LastValue as Aggregator<i64>>::merge(&to, &LastValueState::default());
        assert_eq!(to.value(), Some(1));

        <LastValue as Aggregator<i64>>::merge(&to, &LastValueState::new(2));
        assert_eq!(to.value(), Some(2));
    }

    #[test]
    fn subtract_swap_copies_latest() {
        let new_value = LastValueState::new(3i64);
        let old_value = LastValueState::new(10i64);
        <LastValue as Aggregator<i64>>::subtract_swap(&new_value, &old_value);
        assert_eq!(old_value.value(), Some(3));
    }

    #[test]
    fn storage_round_trips_last_value_only() {
        let aggregation = <LastValue as Aggregator<i64>>::aggregation(&LastValueState::new(5));
        let rebuilt = <LastValue as Aggregator<i64>>::storage(&aggregation).unwrap();
        assert_eq!(rebuilt.value(), Some(5));

        let sum = Aggregation::Sum(metrics::Sum::new(5i64.into()));
        assert!(<LastValue as Aggregator<i64>>::storage(&sum).is_err());
    }
}
