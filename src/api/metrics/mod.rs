//! # OpenTelemetry Metrics API
//!
//! Data types shared between the metrics SDK and exporters: numbers and their
//! kinds, instrument descriptors and the metrics error type.
use std::error::Error;
use std::io;
use std::result;
use std::sync::{PoisonError, TryLockError};
use thiserror::Error;

mod config;
mod descriptor;
mod number;

pub use config::Config;
pub use descriptor::Descriptor;
pub use number::{
    AtomicF64Number, AtomicI64Number, AtomicNumber, DisplayNumber, Number, NumberKind, Numeric,
};

/// A specialized `Result` type for metric operations.
pub type Result<T> = result::Result<T, MetricsError>;

/// Errors returned by the metrics API.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Other errors not covered by specific cases.
    #[error("metrics error: {0}")]
    Other(String),
    /// NaN was recorded on a floating point instrument.
    #[error("NaN value is an invalid input")]
    NaNInput,
    /// A negative value was recorded on a monotonic instrument.
    #[error("negative value is out of range for this instrument")]
    NegativeInput,
    /// Instrument names must not be empty.
    #[error("invalid instrument name: {0:?}")]
    InvalidInstrumentName(String),
    /// An aggregation of one kind was handed to an aggregator of another.
    #[error("inconsistent aggregator types: {0}")]
    InconsistentAggregator(String),
    /// A callback was registered without any instrument.
    #[error("callback registration requires at least one asynchronous instrument")]
    NoInstruments,
    /// A callback named an instrument created by another meter.
    #[error("instrument {0:?} is not owned by this meter")]
    ForeignInstrument(String),
    /// A callback observed through an instrument it was not registered with.
    #[error("instrument {0:?} was not registered with the running callback")]
    UnregisteredInstrument(String),
    /// A callback panicked during collection.
    #[error("callback panicked during collection: {0}")]
    CallbackPanic(String),
    /// The collection context expired before the cycle completed.
    #[error("collection cancelled before completion, snapshot is partial")]
    CollectionCancelled,
    /// A reader was asked to collect before any provider registered with it.
    #[error("reader is not registered with a meter provider")]
    NoProducer,
    /// An exporter failed to export a snapshot.
    #[error("export failed: {0}")]
    ExportFailed(#[source] Box<dyn Error + Send + Sync + 'static>),
    /// IO failure while exporting.
    #[error("io error: {0}")]
    IO(#[from] io::Error),
}

impl<T> From<TryLockError<T>> for MetricsError {
    fn from(err: TryLockError<T>) -> Self {
        MetricsError::Other(err.to_string())
    }
}

impl<T> From<PoisonError<T>> for MetricsError {
    fn from(err: PoisonError<T>) -> Self {
        MetricsError::Other(err.to_string())
    }
}

/// Kinds of OpenTelemetry metric instruments
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InstrumentKind {
    /// A synchronous, monotonic sum.
    Counter,
    /// A synchronous, non-monotonic sum.
    UpDownCounter,
    /// An asynchronous, monotonic sum reported by a callback.
    ObservableCounter,
    /// An asynchronous, non-monotonic sum reported by a callback.
    ObservableUpDownCounter,
    /// An asynchronous current value reported by a callback.
    ObservableGauge,
}

impl InstrumentKind {
    /// Every instrument kind.
    pub const ALL: [InstrumentKind; 5] = [
        InstrumentKind::Counter,
        InstrumentKind::UpDownCounter,
        InstrumentKind::ObservableCounter,
        InstrumentKind::ObservableUpDownCounter,
        InstrumentKind::ObservableGauge,
    ];

    /// Whether this kind receives its values from callbacks at collection
    /// time.
    pub fn asynchronous(self) -> bool {
        !self.synchronous()
    }

    /// Whether this kind is recorded inline by application code.
    pub fn synchronous(self) -> bool {
        matches!(self, InstrumentKind::Counter | InstrumentKind::UpDownCounter)
    }

    /// Whether values of this kind may only grow.
    pub fn monotonic(self) -> bool {
        matches!(
            self,
            InstrumentKind::Counter | InstrumentKind::ObservableCounter
        )
    }

    /// Position of this kind in [`InstrumentKind::ALL`].
    pub(crate) fn index(self) -> usize {
        match self {
            InstrumentKind::Counter => 0,
            InstrumentKind::UpDownCounter => 1,
            InstrumentKind::ObservableCounter => 2,
            InstrumentKind::ObservableUpDownCounter => 3,
            InstrumentKind::ObservableGauge => 4,
        }
    }
}
