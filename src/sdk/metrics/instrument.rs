//! Instruments and the per-reader aggregation state behind them.
use crate::api::metrics::{Config, Descriptor, InstrumentKind, Numeric, Result};
use crate::api::Unit;
use crate::global;
use crate::sdk::export::metrics::{
    range_test, Aggregation, Aggregator, InstrumentMetrics, Sequence, Temporality,
};
use crate::sdk::metrics::{Meter, Observer};
use std::fmt;
use std::marker;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_INSTRUMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of an instrument.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InstrumentId(u64);

impl InstrumentId {
    fn next() -> Self {
        InstrumentId(NEXT_INSTRUMENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// The collection side of an instrument, as seen by a meter's producer.
pub trait Collector: fmt::Debug + Send + Sync {
    /// Identity of the instrument.
    fn id(&self) -> InstrumentId;

    /// Descriptor of the instrument.
    fn descriptor(&self) -> &Descriptor;

    /// Harvest the state kept for `reader` and append the result, if any.
    fn collect(&self, reader: usize, sequence: &Sequence, output: &mut Vec<InstrumentMetrics>);
}

/// The measurement side of an instrument, as seen by its handles.
pub trait Recorder<N>: fmt::Debug + Send + Sync {
    /// Identity of the instrument.
    fn id(&self) -> InstrumentId;

    /// Descriptor of the instrument.
    fn descriptor(&self) -> &Descriptor;

    /// Fold a synchronous measurement into the state of every reader.
    fn record(&self, value: N);

    /// Replace the observation held for `reader`.
    fn observe(&self, reader: usize, value: N);
}

/// State kept for one reader.
///
/// `current` is the only storage touched by application threads. `snapshot`
/// and `previous` are only touched by collection cycles of the owning
/// reader, which never overlap.
///
/// `observed` marks that a callback reported a value in the running cycle,
/// zero included. `started` marks that a cumulative total has been exported
/// once; from then on the total is exported every cycle, even at zero.
#[derive(Debug)]
struct ReaderState<S> {
    temporality: Temporality,
    current: S,
    snapshot: S,
    previous: S,
    observed: AtomicBool,
    started: AtomicBool,
}

/// An instrument aggregating values of type `N` with the method set `A`.
#[derive(Debug)]
pub(crate) struct SdkInstrument<N, A>
where
    N: Numeric,
    A: Aggregator<N>,
{
    id: InstrumentId,
    descriptor: Descriptor,
    readers: Vec<ReaderState<A::Storage>>,
    _marker: marker::PhantomData<(N, A)>,
}

impl<N, A> SdkInstrument<N, A>
where
    N: Numeric,
    A: Aggregator<N>,
{
    /// Create an instrument holding state for one reader per temporality
    /// given. An instrument without readers records nothing.
    pub(crate) fn new<T>(descriptor: Descriptor, temporalities: T) -> Self
    where
        T: IntoIterator<Item = Temporality>,
    {
        let readers = temporalities
            .into_iter()
            .map(|temporality| {
                let state = ReaderState {
                    temporality,
                    current: Default::default(),
                    snapshot: Default::default(),
                    previous: Default::default(),
                    observed: AtomicBool::new(false),
                    started: AtomicBool::new(false),
                };
                A::init(&state.current);
                A::init(&state.snapshot);
                A::init(&state.previous);
                state
            })
            .collect();

        SdkInstrument {
            id: InstrumentId::next(),
            descriptor,
            readers,
            _marker: marker::PhantomData,
        }
    }

    fn collect_sync(state: &ReaderState<A::Storage>) -> Option<Aggregation> {
        A::synchronized_move(&state.current, &state.snapshot);
        match state.temporality {
            Temporality::Delta => {
                if A::has_data(&state.snapshot) {
                    Some(A::aggregation(&state.snapshot))
                } else {
                    None
                }
            }
            Temporality::Cumulative => {
                A::merge(&state.previous, &state.snapshot);
                if A::has_data(&state.previous) {
                    state.started.store(true, Ordering::Relaxed);
                }
                if state.started.load(Ordering::Relaxed) {
                    Some(A::aggregation(&state.previous))
                } else {
                    None
                }
            }
        }
    }

    fn collect_async(state: &ReaderState<A::Storage>) -> Option<Aggregation> {
        A::synchronized_move(&state.current, &state.snapshot);
        if !state.observed.swap(false, Ordering::AcqRel) {
            return None;
        }
        match state.temporality {
            Temporality::Cumulative => Some(A::aggregation(&state.snapshot)),
            Temporality::Delta => {
                // previous <- snapshot - previous, exported, then previous <- snapshot
                A::subtract_swap(&state.snapshot, &state.previous);
                let delta = A::aggregation(&state.previous);
                A::synchronized_move(&state.snapshot, &state.previous);
                Some(delta)
            }
        }
    }
}

impl<N, A> Collector for SdkInstrument<N, A>
where
    N: Numeric,
    A: Aggregator<N>,
{
    fn id(&self) -> InstrumentId {
        self.id
    }

    fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    fn collect(&self, reader: usize, sequence: &Sequence, output: &mut Vec<InstrumentMetrics>) {
        let state = match self.readers.get(reader) {
            Some(state) => state,
            None => return,
        };

        let aggregation = if self.descriptor.instrument_kind().synchronous() {
            Self::collect_sync(state)
        } else {
            Self::collect_async(state)
        };

        if let Some(aggregation) = aggregation {
            let start_time = match state.temporality {
                Temporality::Cumulative => sequence.start,
                Temporality::Delta => sequence.last,
            };
            output.push(InstrumentMetrics::new(
                self.descriptor.clone(),
                state.temporality,
                start_time,
                sequence.now,
                aggregation,
            ));
        }
    }
}

impl<N, A> Recorder<N> for SdkInstrument<N, A>
where
    N: Numeric,
    A: Aggregator<N>,
{
    fn id(&self) -> InstrumentId {
        self.id
    }

    fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    fn record(&self, value: N) {
        if let Err(err) = range_test(value.to_number(), &self.descriptor) {
            global::handle_error(err);
            return;
        }
        for state in &self.readers {
            A::update(&state.current, value);
        }
    }

    fn observe(&self, reader: usize, value: N) {
        if let Err(err) = range_test(value.to_number(), &self.descriptor) {
            global::handle_error(err);
            return;
        }
        if let Some(state) = self.readers.get(reader) {
            A::reset(&state.current);
            A::update(&state.current, value);
            state.observed.store(true, Ordering::Release);
        }
    }
}

/// An asynchronous instrument that callbacks may observe through.
pub trait AsyncInstrument: fmt::Debug + Send + Sync {
    /// Identity of the instrument.
    fn id(&self) -> InstrumentId;

    /// Descriptor of the instrument.
    fn descriptor(&self) -> &Descriptor;
}

/// Typed instrument handles a builder can produce.
pub trait Instrument: Clone + Sized {
    /// The values this instrument records.
    type Number: Numeric;

    /// The kind of instrument.
    const KIND: InstrumentKind;

    /// Wrap the instrument state.
    fn from_recorder(recorder: Arc<dyn Recorder<Self::Number>>) -> Self;
}

/// A synchronous, monotonic sum.
#[derive(Clone, Debug)]
pub struct Counter<N>(Arc<dyn Recorder<N>>);

impl<N: Numeric> Counter<N> {
    /// Increment the counter by `value`. Negative values are rejected.
    pub fn add(&self, value: N) {
        self.0.record(value)
    }

    /// Descriptor of the instrument.
    pub fn descriptor(&self) -> &Descriptor {
        self.0.descriptor()
    }
}

/// A synchronous sum that may go up and down.
#[derive(Clone, Debug)]
pub struct UpDownCounter<N>(Arc<dyn Recorder<N>>);

impl<N: Numeric> UpDownCounter<N> {
    /// Add `value`, which may be negative.
    pub fn add(&self, value: N) {
        self.0.record(value)
    }

    /// Descriptor of the instrument.
    pub fn descriptor(&self) -> &Descriptor {
        self.0.descriptor()
    }
}

/// A monotonic sum reported by a callback.
#[derive(Clone, Debug)]
pub struct ObservableCounter<N>(Arc<dyn Recorder<N>>);

/// A non-monotonic sum reported by a callback.
#[derive(Clone, Debug)]
pub struct ObservableUpDownCounter<N>(Arc<dyn Recorder<N>>);

/// A current value reported by a callback.
#[derive(Clone, Debug)]
pub struct ObservableGauge<N>(Arc<dyn Recorder<N>>);

impl<N: Numeric> ObservableCounter<N> {
    /// Report the current total through the running callback's observer.
    pub fn observe(&self, observer: &Observer<'_>, value: N) {
        observer.observe(self.0.as_ref(), value)
    }
}

impl<N: Numeric> ObservableUpDownCounter<N> {
    /// Report the current total through the running callback's observer.
    pub fn observe(&self, observer: &Observer<'_>, value: N) {
        observer.observe(self.0.as_ref(), value)
    }
}

impl<N: Numeric> ObservableGauge<N> {
    /// Report the current value through the running callback's observer.
    pub fn observe(&self, observer: &Observer<'_>, value: N) {
        observer.observe(self.0.as_ref(), value)
    }
}

macro_rules! instrument_impls {
    ($ty:ident, $kind:expr) => {
        impl<N: Numeric> Instrument for $ty<N> {
            type Number = N;
            const KIND: InstrumentKind = $kind;

            fn from_recorder(recorder: Arc<dyn Recorder<N>>) -> Self {
                $ty(recorder)
            }
        }
    };
    ($ty:ident, $kind:expr, observable) => {
        instrument_impls!($ty, $kind);

        impl<N: Numeric> AsyncInstrument for $ty<N> {
            fn id(&self) -> InstrumentId {
                self.0.id()
            }

            fn descriptor(&self) -> &Descriptor {
                self.0.descriptor()
            }
        }
    };
}

instrument_impls!(Counter, InstrumentKind::Counter);
instrument_impls!(UpDownCounter, InstrumentKind::UpDownCounter);
instrument_impls!(ObservableCounter, InstrumentKind::ObservableCounter, observable);
instrument_impls!(
    ObservableUpDownCounter,
    InstrumentKind::ObservableUpDownCounter,
    observable
);
instrument_impls!(ObservableGauge, InstrumentKind::ObservableGauge, observable);

type Registration<T> = Box<dyn FnOnce(&Meter, &T) -> Result<()>>;

/// Configures and creates an instrument of type `T`.
pub struct InstrumentBuilder<'a, T> {
    meter: &'a Meter,
    name: String,
    description: Option<String>,
    unit: Option<Unit>,
    registration: Option<Registration<T>>,
}

impl<T> fmt::Debug for InstrumentBuilder<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentBuilder")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("unit", &self.unit)
            .field("callback", &self.registration.is_some())
            .finish()
    }
}

impl<'a, T: Instrument> InstrumentBuilder<'a, T> {
    pub(crate) fn new(meter: &'a Meter, name: String) -> Self {
        InstrumentBuilder {
            meter,
            name,
            description: None,
            unit: None,
            registration: None,
        }
    }

    /// Set the description of the instrument.
    pub fn with_description<S: Into<String>>(self, description: S) -> Self {
        InstrumentBuilder {
            description: Some(description.into()),
            ..self
        }
    }

    /// Set the unit of the instrument.
    pub fn with_unit(self, unit: Unit) -> Self {
        InstrumentBuilder {
            unit: Some(unit),
            ..self
        }
    }

    /// Create the instrument, or return the existing instrument of the meter
    /// with the same name, kind, number kind and unit.
    pub fn try_init(self) -> Result<T> {
        let config = Config::new(self.description, self.unit);
        let recorder = self.meter.instrument::<T::Number>(self.name, T::KIND, config)?;
        let instrument = T::from_recorder(recorder);
        if let Some(register) = self.registration {
            register(self.meter, &instrument)?;
        }
        Ok(instrument)
    }

    /// Like `try_init`, but an invalid instrument is reported to the global
    /// error handler and replaced by one that records nowhere.
    pub fn init(self) -> T {
        let meter = self.meter;
        let fallback = Descriptor::new(
            self.name.clone(),
            T::KIND,
            <T::Number as Numeric>::KIND,
            Config::new(self.description.clone(), self.unit.clone()),
        );
        match self.try_init() {
            Ok(instrument) => instrument,
            Err(err) => {
                global::handle_error(err);
                T::from_recorder(meter.detached_instrument(fallback))
            }
        }
    }
}

impl<'a, T> InstrumentBuilder<'a, T>
where
    T: Instrument + AsyncInstrument + 'static,
{
    /// Register `callback` for this instrument alone when it is created.
    pub fn with_callback<F>(self, callback: F) -> Self
    where
        F: Fn(&Observer<'_>, &T) + Send + Sync + 'static,
    {
        let register: Registration<T> = Box::new(move |meter: &Meter, instrument: &T| {
            let handle = instrument.clone();
            let instruments: [&dyn AsyncInstrument; 1] = [instrument];
            meter.register_callback(&instruments, move |observer| callback(observer, &handle))
        });
        InstrumentBuilder {
            registration: Some(register),
            ..self
        }
    }
}
