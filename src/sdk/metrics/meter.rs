//! # Meter
//!
//! A meter is the instrument registry of one instrumentation scope. It
//! deduplicates instruments by name and identity, owns the callbacks
//! registered for its asynchronous instruments and hands both to the
//! provider's producers at collection time.
use crate::api::metrics::{Config, Descriptor, InstrumentKind, MetricsError, Numeric, Result};
use crate::sdk::export::metrics::Aggregator;
use crate::sdk::metrics::aggregators::{LastValueAggregator, SumAggregator};
use crate::sdk::metrics::callback::Callback;
use crate::sdk::metrics::instrument::{
    AsyncInstrument, Collector, Counter, InstrumentBuilder, InstrumentId, ObservableCounter,
    ObservableGauge, ObservableUpDownCounter, Recorder, SdkInstrument, UpDownCounter,
};
use crate::sdk::metrics::pipeline::Pipelines;
use crate::sdk::metrics::selectors::Aggregate;
use crate::sdk::metrics::Observer;
use crate::sdk::InstrumentationLibrary;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::iter;
use std::sync::{Arc, Mutex, PoisonError};

/// Creates instruments for one instrumentation scope.
///
/// Meters are cheap to clone, clones share their registry. Two meters
/// compare equal when they are the same scope of the same provider.
#[derive(Clone, Debug)]
pub struct Meter {
    inner: Arc<MeterInner>,
}

#[derive(Debug)]
struct MeterInner {
    library: InstrumentationLibrary,
    pipelines: Arc<Pipelines>,
    state: Mutex<MeterState>,
}

/// Registry contents. The instrument and callback lists are replaced rather
/// than mutated while a collection holds a snapshot of them.
#[derive(Debug, Default)]
struct MeterState {
    names: HashMap<String, Vec<Registered>>,
    owned: HashSet<InstrumentId>,
    instruments: Arc<Vec<Arc<dyn Collector>>>,
    callbacks: Arc<Vec<Arc<Callback>>>,
}

/// One registered instrument. `recorder` holds an `Arc<dyn Recorder<N>>`
/// for the number type the instrument was created with.
#[derive(Debug)]
struct Registered {
    collector: Arc<dyn Collector>,
    recorder: Box<dyn Any + Send + Sync>,
}

/// The registered instrument matching `descriptor`, if it records `N`.
fn registered<N: Numeric>(
    state: &MeterState,
    descriptor: &Descriptor,
) -> Option<Arc<dyn Recorder<N>>> {
    state
        .names
        .get(descriptor.name())?
        .iter()
        .filter(|entry| entry.collector.descriptor().same_identity(descriptor))
        .find_map(|entry| entry.recorder.downcast_ref::<Arc<dyn Recorder<N>>>())
        .cloned()
}

fn build<N, A>(
    descriptor: Descriptor,
    temporalities: Vec<crate::sdk::export::metrics::Temporality>,
) -> (Arc<dyn Collector>, Arc<dyn Recorder<N>>)
where
    N: Numeric,
    A: Aggregator<N>,
{
    let instrument = Arc::new(SdkInstrument::<N, A>::new(descriptor, temporalities));
    (instrument.clone(), instrument)
}

impl Meter {
    pub(crate) fn new(library: InstrumentationLibrary, pipelines: Arc<Pipelines>) -> Self {
        Meter {
            inner: Arc::new(MeterInner {
                library,
                pipelines,
                state: Mutex::new(MeterState::default()),
            }),
        }
    }

    /// The scope this meter creates instruments for.
    pub fn library(&self) -> &InstrumentationLibrary {
        &self.inner.library
    }

    /// Creates a builder for an `i64` counter.
    pub fn i64_counter<T: Into<String>>(&self, name: T) -> InstrumentBuilder<'_, Counter<i64>> {
        InstrumentBuilder::new(self, name.into())
    }

    /// Creates a builder for an `f64` counter.
    pub fn f64_counter<T: Into<String>>(&self, name: T) -> InstrumentBuilder<'_, Counter<f64>> {
        InstrumentBuilder::new(self, name.into())
    }

    /// Creates a builder for an `i64` up-down counter.
    pub fn i64_up_down_counter<T: Into<String>>(
        &self,
        name: T,
    ) -> InstrumentBuilder<'_, UpDownCounter<i64>> {
        InstrumentBuilder::new(self, name.into())
    }

    /// Creates a builder for an `f64` up-down counter.
    pub fn f64_up_down_counter<T: Into<String>>(
        &self,
        name: T,
    ) -> InstrumentBuilder<'_, UpDownCounter<f64>> {
        InstrumentBuilder::new(self, name.into())
    }

    /// Creates a builder for an `i64` observable counter.
    pub fn i64_observable_counter<T: Into<String>>(
        &self,
        name: T,
    ) -> InstrumentBuilder<'_, ObservableCounter<i64>> {
        InstrumentBuilder::new(self, name.into())
    }

    /// Creates a builder for an `f64` observable counter.
    pub fn f64_observable_counter<T: Into<String>>(
        &self,
        name: T,
    ) -> InstrumentBuilder<'_, ObservableCounter<f64>> {
        InstrumentBuilder::new(self, name.into())
    }

    /// Creates a builder for an `i64` observable up-down counter.
    pub fn i64_observable_up_down_counter<T: Into<String>>(
        &self,
        name: T,
    ) -> InstrumentBuilder<'_, ObservableUpDownCounter<i64>> {
        InstrumentBuilder::new(self, name.into())
    }

    /// Creates a builder for an `f64` observable up-down counter.
    pub fn f64_observable_up_down_counter<T: Into<String>>(
        &self,
        name: T,
    ) -> InstrumentBuilder<'_, ObservableUpDownCounter<f64>> {
        InstrumentBuilder::new(self, name.into())
    }

    /// Creates a builder for an `i64` observable gauge.
    pub fn i64_observable_gauge<T: Into<String>>(
        &self,
        name: T,
    ) -> InstrumentBuilder<'_, ObservableGauge<i64>> {
        InstrumentBuilder::new(self, name.into())
    }

    /// Creates a builder for an `f64` observable gauge.
    pub fn f64_observable_gauge<T: Into<String>>(
        &self,
        name: T,
    ) -> InstrumentBuilder<'_, ObservableGauge<f64>> {
        InstrumentBuilder::new(self, name.into())
    }

    /// Register `callback` to report the values of `instruments` at the
    /// start of every collection cycle.
    ///
    /// Every instrument must have been created by this meter. Observations
    /// through any other instrument are rejected while the callback runs.
    /// Callbacks stay registered for the lifetime of the meter.
    pub fn register_callback<F>(
        &self,
        instruments: &[&dyn AsyncInstrument],
        callback: F,
    ) -> Result<()>
    where
        F: Fn(&Observer<'_>) + Send + Sync + 'static,
    {
        if instruments.is_empty() {
            return Err(MetricsError::NoInstruments);
        }

        let mut state = self.inner.state.lock()?;
        let mut ids = Vec::with_capacity(instruments.len());
        for instrument in instruments {
            let id = instrument.id();
            if !state.owned.contains(&id) {
                return Err(MetricsError::ForeignInstrument(
                    instrument.descriptor().name().to_string(),
                ));
            }
            ids.push(id);
        }

        Arc::make_mut(&mut state.callbacks).push(Arc::new(Callback::new(ids, Box::new(callback))));
        Ok(())
    }

    /// Find the instrument of this meter with the same name and identity, or
    /// create and register a new one.
    pub(crate) fn instrument<N: Numeric>(
        &self,
        name: String,
        kind: InstrumentKind,
        config: Config,
    ) -> Result<Arc<dyn Recorder<N>>> {
        if name.is_empty() {
            return Err(MetricsError::InvalidInstrumentName(name));
        }
        let descriptor = Descriptor::new(name.clone(), kind, N::KIND, config);
        if let Some(recorder) = registered(&*self.inner.state.lock()?, &descriptor) {
            return Ok(recorder);
        }

        // views and the selector run unlocked, they may call back into the meter
        let pipelines = &self.inner.pipelines;
        let aggregate = pipelines.aggregate_for(&self.inner.library, &descriptor);
        let (collector, recorder) = match aggregate {
            Aggregate::Sum => build::<N, SumAggregator>(descriptor, pipelines.temporalities(kind)),
            Aggregate::LastValue => {
                build::<N, LastValueAggregator>(descriptor, pipelines.temporalities(kind))
            }
            Aggregate::Drop => build::<N, SumAggregator>(descriptor, Vec::new()),
        };

        let mut state = self.inner.state.lock()?;
        if let Some(recorder) = registered(&state, collector.descriptor()) {
            return Ok(recorder);
        }
        state.owned.insert(collector.id());
        Arc::make_mut(&mut state.instruments).push(collector.clone());
        state.names.entry(name).or_default().push(Registered {
            collector,
            recorder: Box::new(recorder.clone()),
        });
        Ok(recorder)
    }

    /// An instrument that is not registered anywhere and records nothing.
    pub(crate) fn detached_instrument<N: Numeric>(
        &self,
        descriptor: Descriptor,
    ) -> Arc<dyn Recorder<N>> {
        Arc::new(SdkInstrument::<N, SumAggregator>::new(
            descriptor,
            iter::empty(),
        ))
    }

    /// The callbacks and instruments registered so far, in registration
    /// order.
    pub(crate) fn snapshot(&self) -> (Arc<Vec<Arc<Callback>>>, Arc<Vec<Arc<dyn Collector>>>) {
        let state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        (state.callbacks.clone(), state.instruments.clone())
    }
}

impl PartialEq for Meter {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Meter {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Unit;
    use crate::sdk::metrics::selectors::{simple, AggregationSelector};
    use crate::sdk::metrics::View;

    fn meter(views: Vec<View>) -> Meter {
        let pipelines = Pipelines::new(&[], views, Box::new(simple::Selector::default()));
        Meter::new(
            InstrumentationLibrary::new("test", None, None),
            Arc::new(pipelines),
        )
    }

    fn instrument_count(meter: &Meter) -> usize {
        meter.snapshot().1.len()
    }

    #[test]
    fn same_identity_returns_existing_instrument() {
        let meter = meter(vec![]);
        let a = meter
            .i64_counter("requests")
            .with_description("first")
            .try_init()
            .unwrap();
        let b = meter
            .i64_counter("requests")
            .with_description("second")
            .try_init()
            .unwrap();
        assert_eq!(instrument_count(&meter), 1);
        assert_eq!(a.descriptor().description().map(String::as_str), Some("first"));
        assert_eq!(b.descriptor().description().map(String::as_str), Some("first"));
    }

    #[test]
    fn different_identity_creates_new_instrument() {
        let meter = meter(vec![]);
        meter.i64_counter("requests").try_init().unwrap();
        meter.f64_counter("requests").try_init().unwrap();
        meter.i64_up_down_counter("requests").try_init().unwrap();
        meter
            .i64_counter("requests")
            .with_unit(Unit::new("ms"))
            .try_init()
            .unwrap();
        assert_eq!(instrument_count(&meter), 4);

        // every variant is found again
        meter.f64_counter("requests").try_init().unwrap();
        meter
            .i64_counter("requests")
            .with_unit(Unit::new("ms"))
            .try_init()
            .unwrap();
        assert_eq!(instrument_count(&meter), 4);
    }

    #[test]
    fn empty_name_is_rejected() {
        let meter = meter(vec![]);
        assert!(matches!(
            meter.i64_counter("").try_init(),
            Err(MetricsError::InvalidInstrumentName(_))
        ));
        assert_eq!(instrument_count(&meter), 0);
    }

    #[test]
    fn callback_registration_is_validated() {
        let meter = meter(vec![]);
        let other = self::meter(vec![]);
        let gauge = meter.i64_observable_gauge("temp").try_init().unwrap();
        let foreign = other.i64_observable_gauge("temp").try_init().unwrap();

        assert!(matches!(
            meter.register_callback(&[], |_| {}),
            Err(MetricsError::NoInstruments)
        ));
        assert!(matches!(
            meter.register_callback(&[&gauge, &foreign], |_| {}),
            Err(MetricsError::ForeignInstrument(_))
        ));
        assert_eq!(meter.snapshot().0.len(), 0);

        meter.register_callback(&[&gauge], |_| {}).unwrap();
        assert_eq!(meter.snapshot().0.len(), 1);
    }

    #[test]
    fn dropped_instruments_are_still_registered() {
        let meter = meter(vec![View::new("ignored", Aggregate::Drop)]);
        meter.i64_counter("ignored").try_init().unwrap();
        meter.i64_counter("ignored").try_init().unwrap();
        assert_eq!(instrument_count(&meter), 1);
    }

    #[test]
    fn snapshots_are_not_affected_by_later_registration() {
        let meter = meter(vec![]);
        meter.i64_counter("a").try_init().unwrap();
        let (_, before) = meter.snapshot();
        meter.i64_counter("b").try_init().unwrap();
        assert_eq!(before.len(), 1);
        assert_eq!(instrument_count(&meter), 2);
    }

    #[test]
    fn meter_equality_is_identity() {
        let a = meter(vec![]);
        let b = meter(vec![]);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[derive(Clone, Debug, Default)]
    struct InspectingSelector {
        meter: Arc<Mutex<Option<Meter>>>,
        seen: Arc<Mutex<Vec<usize>>>,
    }

    impl AggregationSelector for InspectingSelector {
        fn aggregator_for(&self, _descriptor: &Descriptor) -> Aggregate {
            if let Some(meter) = self.meter.lock().unwrap().as_ref() {
                self.seen.lock().unwrap().push(meter.snapshot().1.len());
            }
            Aggregate::Sum
        }
    }

    #[test]
    fn selector_may_use_the_meter() {
        let selector = InspectingSelector::default();
        let pipelines = Pipelines::new(&[], vec![], Box::new(selector.clone()));
        let meter = Meter::new(
            InstrumentationLibrary::new("test", None, None),
            Arc::new(pipelines),
        );
        *selector.meter.lock().unwrap() = Some(meter.clone());

        meter.i64_counter("a").try_init().unwrap();
        meter.i64_counter("b").try_init().unwrap();
        meter.i64_counter("a").try_init().unwrap();
        assert_eq!(*selector.seen.lock().unwrap(), vec![0, 1]);
        assert_eq!(instrument_count(&meter), 2);

        *selector.meter.lock().unwrap() = None;
    }
}
