//! Metrics SDK Aggregator export API
use crate::api::metrics::{Descriptor, MetricsError, Number, Numeric, Result};
use crate::sdk::export::metrics::Aggregation;
use std::fmt;

/// RangeTest is a common routine for testing for valid input values. This
/// rejects NaN values. This rejects negative values when the metric
/// instrument does not support negative values, including monotonic counter
/// metrics.
pub fn range_test(number: Number, descriptor: &Descriptor) -> Result<()> {
    let kind = descriptor.number_kind();
    if number.is_nan(kind) {
        return Err(MetricsError::NaNInput);
    }

    if descriptor.instrument_kind().monotonic() && number.is_negative(kind) {
        return Err(MetricsError::NegativeInput);
    }
    Ok(())
}

/// Aggregator is the method set of one aggregation behavior over values of
/// type `N`.
///
/// An aggregator holds no state. Every operation acts on an externally owned
/// `Storage`, so one implementation serves every instrument and both numeric
/// kinds, and the per-measurement `update` call is resolved statically.
///
/// Any `Storage` may be touched concurrently by `update` from application
/// threads and by `synchronized_move` from a collecting thread. The other
/// operations run on storages the collector owns exclusively.
pub trait Aggregator<N: Numeric>: fmt::Debug + Send + Sync + 'static {
    /// The mutable statistic this method set operates on.
    type Storage: fmt::Debug + Default + Send + Sync;

    /// Set the storage to the identity value.
    fn init(storage: &Self::Storage);

    /// Fold one measurement into the storage.
    ///
    /// Safe to call concurrently with itself and with `synchronized_move` on
    /// the same storage.
    fn update(storage: &Self::Storage, value: N);

    /// Atomically move the value out of `source` into `destination`,
    /// resetting `source` to identity.
    ///
    /// Every concurrent `update` on `source` is reflected either in the moved
    /// value or in what remains in `source` afterwards, never in both and
    /// never in neither.
    fn synchronized_move(source: &Self::Storage, destination: &Self::Storage);

    /// Discard the accumulated value without producing output.
    fn reset(storage: &Self::Storage);

    /// Whether the storage has received a non-identity value since it was
    /// last moved out or reset.
    fn has_data(storage: &Self::Storage) -> bool;

    /// Combine `from` into `to`. Neither storage may be concurrently updated.
    fn merge(to: &Self::Storage, from: &Self::Storage);

    /// Overwrite `old_value_modified` with the change from it to `new_value`.
    /// Used to derive deltas from two cumulative observations.
    fn subtract_swap(new_value: &Self::Storage, old_value_modified: &Self::Storage);

    /// A read-only copy of the storage at the moment of the call.
    fn aggregation(storage: &Self::Storage) -> Aggregation;

    /// Rebuild a storage from an exported aggregation of this kind.
    fn storage(aggregation: &Aggregation) -> Result<Self::Storage>;
}
