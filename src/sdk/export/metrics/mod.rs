//! Metrics Export
//!
//! The contract between the SDK and export backends. A provider hands every
//! registered [`MetricReader`] a [`Producer`]; the reader calls
//! [`Producer::produce`] whenever it wants a snapshot, on a timer or on
//! demand, and passes the resulting [`ResourceMetrics`] on to an
//! [`Exporter`] or returns it to its caller.
use crate::api::metrics::{Descriptor, InstrumentKind, Result};
use crate::api::Context;
use crate::sdk::{InstrumentationLibrary, Resource};
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

mod aggregation;
pub mod aggregator;

pub use aggregation::{Aggregation, AggregationKind, LastValue, Sum};
pub use aggregator::{range_test, Aggregator};

/// Defines the window that an aggregation was calculated over.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Temporality {
    /// A measurement interval that continues to expand forward in time from a
    /// starting point.
    Cumulative,
    /// A measurement interval that resets each cycle.
    Delta,
}

/// Selects the temporality a reader wants for each instrument kind.
pub trait TemporalitySelector: fmt::Debug + Send + Sync {
    /// Selects the temporality to use based on the [`InstrumentKind`].
    fn temporality(&self, kind: InstrumentKind) -> Temporality;
}

impl TemporalitySelector for Temporality {
    fn temporality(&self, _kind: InstrumentKind) -> Temporality {
        *self
    }
}

/// Cumulative temporality for every instrument kind.
#[derive(Clone, Copy, Debug, Default)]
pub struct CumulativeTemporalitySelector;

impl TemporalitySelector for CumulativeTemporalitySelector {
    fn temporality(&self, _kind: InstrumentKind) -> Temporality {
        Temporality::Cumulative
    }
}

/// Delta temporality for every instrument kind except the up-down counters,
/// whose values are only meaningful as running totals.
#[derive(Clone, Copy, Debug, Default)]
pub struct DeltaTemporalitySelector;

impl TemporalitySelector for DeltaTemporalitySelector {
    fn temporality(&self, kind: InstrumentKind) -> Temporality {
        match kind {
            InstrumentKind::UpDownCounter | InstrumentKind::ObservableUpDownCounter => {
                Temporality::Cumulative
            }
            InstrumentKind::Counter
            | InstrumentKind::ObservableCounter
            | InstrumentKind::ObservableGauge => Temporality::Delta,
        }
    }
}

/// The time window one collection cycle covers.
///
/// For one reader, `start <= last <= now` always holds and each cycle's
/// `last` equals the previous cycle's `now`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sequence {
    /// When the provider was built.
    pub start: SystemTime,
    /// When this reader last collected, or `start` on the first cycle.
    pub last: SystemTime,
    /// When this cycle began.
    pub now: SystemTime,
}

/// The snapshot produced by one collection cycle.
#[derive(Clone, Debug)]
pub struct ResourceMetrics {
    resource: Arc<Resource>,
    scopes: Vec<ScopeMetrics>,
}

impl ResourceMetrics {
    /// Assemble a snapshot.
    pub fn new(resource: Arc<Resource>, scopes: Vec<ScopeMetrics>) -> Self {
        ResourceMetrics { resource, scopes }
    }

    /// The resource of the provider that produced the snapshot.
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// One entry per scope, in the order the scopes were created.
    pub fn scopes(&self) -> &[ScopeMetrics] {
        &self.scopes
    }
}

/// The instruments of one scope within a snapshot.
#[derive(Clone, Debug)]
pub struct ScopeMetrics {
    library: InstrumentationLibrary,
    instruments: Vec<InstrumentMetrics>,
}

impl ScopeMetrics {
    /// Assemble the output of one scope.
    pub fn new(library: InstrumentationLibrary, instruments: Vec<InstrumentMetrics>) -> Self {
        ScopeMetrics {
            library,
            instruments,
        }
    }

    /// Identity of the scope.
    pub fn library(&self) -> &InstrumentationLibrary {
        &self.library
    }

    /// Instruments that reported data, in the order they were created.
    pub fn instruments(&self) -> &[InstrumentMetrics] {
        &self.instruments
    }
}

/// The harvested statistic of one instrument.
#[derive(Clone, Debug)]
pub struct InstrumentMetrics {
    descriptor: Descriptor,
    temporality: Temporality,
    start_time: SystemTime,
    end_time: SystemTime,
    aggregation: Aggregation,
}

impl InstrumentMetrics {
    /// Assemble the output of one instrument.
    pub fn new(
        descriptor: Descriptor,
        temporality: Temporality,
        start_time: SystemTime,
        end_time: SystemTime,
        aggregation: Aggregation,
    ) -> Self {
        InstrumentMetrics {
            descriptor,
            temporality,
            start_time,
            end_time,
            aggregation,
        }
    }

    /// Descriptor of the instrument.
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// Temporality the aggregation was computed with.
    pub fn temporality(&self) -> Temporality {
        self.temporality
    }

    /// Start of the window the aggregation covers.
    pub fn start_time(&self) -> SystemTime {
        self.start_time
    }

    /// End of the window the aggregation covers.
    pub fn end_time(&self) -> SystemTime {
        self.end_time
    }

    /// The aggregated value.
    pub fn aggregation(&self) -> &Aggregation {
        &self.aggregation
    }
}

/// Produces snapshots on behalf of one provider for one reader.
pub trait Producer: fmt::Debug + Send + Sync {
    /// Run one collection cycle and return its snapshot.
    ///
    /// Cycles of one producer never overlap. If `cx` is done before the cycle
    /// completes the snapshot covers only the work finished so far.
    fn produce(&self, cx: &Context) -> ResourceMetrics;
}

/// An export backend that reads snapshots from a provider.
///
/// The provider registers one [`Producer`] with every reader it is built
/// with; the reader then decides when to collect.
pub trait MetricReader: TemporalitySelector + fmt::Debug + Send + Sync + 'static {
    /// Accept the producer of the provider this reader was added to.
    fn register_producer(&self, producer: Box<dyn Producer>);
}

/// Exporter handles presentation of the snapshots a reader collects.
pub trait Exporter: fmt::Debug {
    /// Export is called immediately after completing a collection pass in the
    /// SDK.
    fn export(&self, metrics: &ResourceMetrics) -> Result<()>;
}
