use opentelemetry_metrics::api::metrics::{InstrumentKind, MetricsError};
use opentelemetry_metrics::api::{Context, KeyValue, Unit};
use opentelemetry_metrics::global;
use opentelemetry_metrics::sdk::export::metrics::{
    DeltaTemporalitySelector, InstrumentMetrics, ResourceMetrics, Temporality,
};
use opentelemetry_metrics::sdk::metrics::selectors::{simple, Aggregate};
use opentelemetry_metrics::sdk::metrics::{controllers, MeterProvider, PullController, View};
use opentelemetry_metrics::sdk::Resource;
use std::cell::RefCell;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::thread;

thread_local! {
    static ERRORS: RefCell<Vec<String>> = RefCell::new(Vec::new());
}

/// Errors reported on the current thread since the last call.
fn take_errors() -> Vec<String> {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        global::set_error_handler(|err: MetricsError| {
            ERRORS.with(|errors| errors.borrow_mut().push(err.to_string()))
        })
        .unwrap();
    });
    ERRORS.with(|errors| errors.borrow_mut().drain(..).collect())
}

fn setup(temporality: Temporality) -> (PullController, MeterProvider) {
    take_errors();
    let reader = controllers::pull().with_temporality(temporality).build();
    let provider = MeterProvider::builder()
        .with_reader(reader.clone())
        .with_resource(Resource::new(vec![KeyValue::new("service.name", "tests")]))
        .build();
    (reader, provider)
}

fn find<'a>(metrics: &'a ResourceMetrics, name: &str) -> Option<&'a InstrumentMetrics> {
    metrics
        .scopes()
        .iter()
        .flat_map(|scope| scope.instruments())
        .find(|m| m.descriptor().name() == name)
}

fn i64_value(metrics: &ResourceMetrics, name: &str) -> Option<i64> {
    find(metrics, name).map(|m| {
        m.aggregation()
            .as_sum()
            .map(|s| s.sum().to_i64())
            .or_else(|| m.aggregation().as_last_value().map(|v| v.last_value().to_i64()))
            .unwrap()
    })
}

fn f64_value(metrics: &ResourceMetrics, name: &str) -> Option<f64> {
    find(metrics, name).map(|m| {
        m.aggregation()
            .as_sum()
            .map(|s| s.sum().to_f64())
            .or_else(|| m.aggregation().as_last_value().map(|v| v.last_value().to_f64()))
            .unwrap()
    })
}

#[test]
fn delta_counter_reports_each_cycle_once() {
    let (reader, provider) = setup(Temporality::Delta);
    let counter = provider.meter("lib").i64_counter("requests").init();
    counter.add(1);
    counter.add(2);
    counter.add(3);

    let first = reader.collect().unwrap();
    assert_eq!(i64_value(&first, "requests"), Some(6));
    assert_eq!(
        find(&first, "requests").unwrap().temporality(),
        Temporality::Delta
    );

    let second = reader.collect().unwrap();
    assert_eq!(i64_value(&second, "requests"), None);
}

#[test]
fn cumulative_counter_keeps_growing() {
    let (reader, provider) = setup(Temporality::Cumulative);
    let counter = provider.meter("lib").f64_counter("bytes").init();
    counter.add(1.5);
    assert_eq!(f64_value(&reader.collect().unwrap(), "bytes"), Some(1.5));
    counter.add(2.0);
    let metrics = reader.collect().unwrap();
    assert_eq!(f64_value(&metrics, "bytes"), Some(3.5));
    let bytes = find(&metrics, "bytes").unwrap();
    assert!(bytes.start_time() <= bytes.end_time());
}

#[test]
fn observed_value_is_reported_every_cycle() {
    let (reader, provider) = setup(Temporality::Cumulative);
    provider
        .meter("lib")
        .i64_observable_up_down_counter("queue.depth")
        .with_callback(|observer, counter| counter.observe(observer, 42))
        .init();

    assert_eq!(i64_value(&reader.collect().unwrap(), "queue.depth"), Some(42));
    assert_eq!(i64_value(&reader.collect().unwrap(), "queue.depth"), Some(42));
}

#[test]
fn cumulative_totals_back_at_zero_stay_reported() {
    let (reader, provider) = setup(Temporality::Cumulative);
    let meter = provider.meter("lib");
    let jobs = meter.i64_up_down_counter("jobs.queued").init();
    let depth = Arc::new(AtomicI64::new(5));
    let source = depth.clone();
    meter
        .i64_observable_up_down_counter("queue.depth")
        .with_callback(move |observer, counter| {
            counter.observe(observer, source.load(Ordering::SeqCst))
        })
        .init();

    jobs.add(5);
    let first = reader.collect().unwrap();
    assert_eq!(i64_value(&first, "jobs.queued"), Some(5));
    assert_eq!(i64_value(&first, "queue.depth"), Some(5));

    jobs.add(-5);
    depth.store(0, Ordering::SeqCst);
    let second = reader.collect().unwrap();
    assert_eq!(second.scopes()[0].instruments().len(), 2);
    assert_eq!(i64_value(&second, "jobs.queued"), Some(0));
    assert_eq!(i64_value(&second, "queue.depth"), Some(0));
}

#[test]
fn delta_observable_counter_reports_increments() {
    let (reader, provider) = setup(Temporality::Delta);
    let total = Arc::new(AtomicI64::new(10));
    let source = total.clone();
    provider
        .meter("lib")
        .i64_observable_counter("cpu.time")
        .with_callback(move |observer, counter| {
            counter.observe(observer, source.load(Ordering::SeqCst))
        })
        .init();

    assert_eq!(i64_value(&reader.collect().unwrap(), "cpu.time"), Some(10));
    total.store(17, Ordering::SeqCst);
    assert_eq!(i64_value(&reader.collect().unwrap(), "cpu.time"), Some(7));
}

#[test]
fn gauges_report_the_last_observation() {
    let (reader, provider) = setup(Temporality::Cumulative);
    provider
        .meter("lib")
        .f64_observable_gauge("temperature")
        .with_callback(|observer, gauge| {
            gauge.observe(observer, 20.0);
            gauge.observe(observer, 21.5);
        })
        .init();

    let metrics = reader.collect().unwrap();
    let temperature = find(&metrics, "temperature").unwrap();
    assert!(temperature.aggregation().as_last_value().is_some());
    assert_eq!(f64_value(&metrics, "temperature"), Some(21.5));
}

#[test]
fn one_callback_can_report_several_instruments() {
    let (reader, provider) = setup(Temporality::Cumulative);
    let meter = provider.meter("lib");
    let used = meter.i64_observable_gauge("memory.used").init();
    let free = meter.i64_observable_gauge("memory.free").init();
    let (used_handle, free_handle) = (used.clone(), free.clone());
    meter
        .register_callback(&[&used, &free], move |observer| {
            used_handle.observe(observer, 300);
            free_handle.observe(observer, 700);
        })
        .unwrap();

    let metrics = reader.collect().unwrap();
    assert_eq!(i64_value(&metrics, "memory.used"), Some(300));
    assert_eq!(i64_value(&metrics, "memory.free"), Some(700));
}

#[test]
fn observing_an_unregistered_instrument_is_rejected() {
    let (reader, provider) = setup(Temporality::Cumulative);
    let meter = provider.meter("lib");
    let registered = meter.i64_observable_gauge("registered").init();
    let other = meter.i64_observable_gauge("other").init();
    let handles = (registered.clone(), other);
    meter
        .register_callback(&[&registered], move |observer| {
            handles.0.observe(observer, 1);
            handles.1.observe(observer, 2);
        })
        .unwrap();

    let metrics = reader.collect().unwrap();
    assert_eq!(i64_value(&metrics, "registered"), Some(1));
    assert_eq!(i64_value(&metrics, "other"), None);
    let errors = take_errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("other"));
}

#[test]
fn duplicate_registration_returns_the_same_instrument() {
    let (reader, provider) = setup(Temporality::Cumulative);
    let meter = provider.meter("lib");
    let a = meter
        .i64_counter("requests")
        .with_unit(Unit::new("1"))
        .with_description("requests served")
        .init();
    let b = meter
        .i64_counter("requests")
        .with_unit(Unit::new("1"))
        .with_description("a different description")
        .init();
    a.add(1);
    b.add(1);

    let metrics = reader.collect().unwrap();
    assert_eq!(metrics.scopes()[0].instruments().len(), 1);
    assert_eq!(i64_value(&metrics, "requests"), Some(2));
}

#[test]
fn conflicting_kinds_with_one_name_coexist() {
    let (reader, provider) = setup(Temporality::Cumulative);
    let meter = provider.meter("lib");
    meter.i64_counter("jobs").init().add(5);
    meter.i64_up_down_counter("jobs").init().add(-2);

    let metrics = reader.collect().unwrap();
    let mut kinds: Vec<_> = metrics.scopes()[0]
        .instruments()
        .iter()
        .map(|m| m.descriptor().instrument_kind())
        .collect();
    kinds.sort_by_key(|kind| format!("{:?}", kind));
    assert_eq!(
        kinds,
        vec![InstrumentKind::Counter, InstrumentKind::UpDownCounter]
    );
}

#[test]
fn invalid_measurements_are_dropped_and_reported() {
    let (reader, provider) = setup(Temporality::Cumulative);
    let meter = provider.meter("lib");
    let counter = meter.f64_counter("latency").init();
    counter.add(-1.0);
    counter.add(f64::NAN);
    counter.add(2.0);
    meter.f64_up_down_counter("balance").init().add(-3.0);

    let metrics = reader.collect().unwrap();
    assert_eq!(f64_value(&metrics, "latency"), Some(2.0));
    assert_eq!(f64_value(&metrics, "balance"), Some(-3.0));
    assert_eq!(take_errors().len(), 2);
}

#[test]
fn invalid_name_yields_a_detached_instrument() {
    let (reader, provider) = setup(Temporality::Cumulative);
    let meter = provider.meter("lib");
    assert!(matches!(
        meter.i64_counter("").try_init(),
        Err(MetricsError::InvalidInstrumentName(_))
    ));

    let counter = meter.i64_counter("").init();
    counter.add(1);
    assert_eq!(take_errors().len(), 1);
    assert!(reader.collect().unwrap().scopes()[0].instruments().is_empty());
}

#[test]
fn callbacks_must_name_instruments_of_their_meter() {
    let (_reader, provider) = setup(Temporality::Cumulative);
    let meter = provider.meter("a");
    let foreign = provider.meter("b").i64_observable_gauge("x").init();

    assert!(matches!(
        meter.register_callback(&[], |_| {}),
        Err(MetricsError::NoInstruments)
    ));
    assert!(matches!(
        meter.register_callback(&[&foreign], |_| {}),
        Err(MetricsError::ForeignInstrument(_))
    ));
}

#[test]
fn panicking_callback_does_not_stop_collection() {
    let (reader, provider) = setup(Temporality::Cumulative);
    let broken = provider.meter("broken");
    let gauge = broken.i64_observable_gauge("never").init();
    broken
        .register_callback(&[&gauge], |_| panic!("sensor offline"))
        .unwrap();
    provider
        .meter("healthy")
        .i64_observable_gauge("always")
        .with_callback(|observer, gauge| gauge.observe(observer, 1))
        .init();

    let metrics = reader.collect().unwrap();
    assert_eq!(metrics.scopes().len(), 2);
    assert_eq!(i64_value(&metrics, "always"), Some(1));
    let errors = take_errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("sensor offline"));
}

#[test]
fn cancelled_collection_stops_early() {
    let (reader, provider) = setup(Temporality::Cumulative);
    let (cx, cancel) = Context::new().with_cancellation();
    let meter = provider.meter("lib");
    let gauge = meter.i64_observable_gauge("first").init();
    let handle = gauge.clone();
    meter
        .register_callback(&[&gauge], move |observer| {
            handle.observe(observer, 1);
            cancel.cancel();
        })
        .unwrap();
    let late = Arc::new(AtomicUsize::new(0));
    let counted = late.clone();
    meter
        .i64_observable_gauge("second")
        .with_callback(move |_, _| {
            counted.fetch_add(1, Ordering::SeqCst);
        })
        .init();

    let metrics = reader.collect_with_context(&cx).unwrap();
    assert_eq!(late.load(Ordering::SeqCst), 0);
    assert!(metrics.scopes()[0].instruments().is_empty());
    assert!(take_errors()[0].contains("cancelled"));

    // a later cycle runs everything again
    let metrics = reader.collect().unwrap();
    assert_eq!(late.load(Ordering::SeqCst), 1);
    assert_eq!(i64_value(&metrics, "first"), Some(1));
}

#[test]
fn views_override_and_drop_aggregations() {
    take_errors();
    let reader = controllers::pull().build();
    let provider = MeterProvider::builder()
        .with_reader(reader.clone())
        .with_view(View::new("debug.*", Aggregate::Drop))
        .with_view(View::new("pool.size", Aggregate::LastValue).with_scope_name("db"))
        .build();

    let db = provider.meter("db");
    db.i64_counter("debug.events").init().add(1);
    let size = db.i64_up_down_counter("pool.size").init();
    size.add(5);
    size.add(3);
    provider.meter("web").i64_up_down_counter("pool.size").init().add(5);

    let metrics = reader.collect().unwrap();
    let db_scope = &metrics.scopes()[0];
    assert_eq!(db_scope.instruments().len(), 1);
    assert_eq!(
        db_scope.instruments()[0]
            .aggregation()
            .as_last_value()
            .map(|v| v.last_value().to_i64()),
        Some(3)
    );
    let web_scope = &metrics.scopes()[1];
    assert!(web_scope.instruments()[0].aggregation().as_sum().is_some());
}

#[test]
fn sum_selector_applies_to_gauges() {
    let reader = controllers::pull().build();
    let provider = MeterProvider::builder()
        .with_reader(reader.clone())
        .with_aggregation_selector(simple::Selector::Sum)
        .build();
    provider
        .meter("lib")
        .i64_observable_gauge("g")
        .with_callback(|observer, gauge| gauge.observe(observer, 4))
        .init();

    let metrics = reader.collect().unwrap();
    assert!(find(&metrics, "g").unwrap().aggregation().as_sum().is_some());
}

#[test]
fn readers_collect_independently() {
    let delta = controllers::pull()
        .with_temporality(DeltaTemporalitySelector)
        .build();
    let cumulative = controllers::pull().build();
    let provider = MeterProvider::builder()
        .with_reader(delta.clone())
        .with_reader(cumulative.clone())
        .build();
    let meter = provider.meter("lib");
    let counter = meter.i64_counter("hits").init();
    let balance = meter.i64_up_down_counter("balance").init();

    counter.add(2);
    balance.add(2);
    assert_eq!(i64_value(&delta.collect().unwrap(), "hits"), Some(2));
    counter.add(3);
    balance.add(-1);

    let delta_metrics = delta.collect().unwrap();
    assert_eq!(i64_value(&delta_metrics, "hits"), Some(3));
    assert_eq!(
        find(&delta_metrics, "balance").unwrap().temporality(),
        Temporality::Cumulative
    );
    assert_eq!(i64_value(&delta_metrics, "balance"), Some(1));

    let cumulative_metrics = cumulative.collect().unwrap();
    assert_eq!(i64_value(&cumulative_metrics, "hits"), Some(5));
}

#[test]
fn delta_windows_are_contiguous() {
    let (reader, provider) = setup(Temporality::Delta);
    let counter = provider.meter("lib").i64_counter("ticks").init();

    let mut previous_end = None;
    for _ in 0..5 {
        counter.add(1);
        let metrics = reader.collect().unwrap();
        let ticks = find(&metrics, "ticks").unwrap();
        assert!(ticks.start_time() <= ticks.end_time());
        if let Some(previous_end) = previous_end {
            assert_eq!(ticks.start_time(), previous_end);
        }
        previous_end = Some(ticks.end_time());
    }
}

#[test]
fn concurrent_updates_are_never_lost() {
    let (reader, provider) = setup(Temporality::Delta);
    let counter = provider.meter("lib").i64_counter("ops").init();

    let writers: Vec<_> = (0..4)
        .map(|_| {
            let counter = counter.clone();
            thread::spawn(move || {
                for _ in 0..10_000 {
                    counter.add(1);
                }
            })
        })
        .collect();

    let mut harvested = 0;
    for _ in 0..200 {
        harvested += i64_value(&reader.collect().unwrap(), "ops").unwrap_or(0);
        thread::yield_now();
    }
    for writer in writers {
        writer.join().unwrap();
    }
    harvested += i64_value(&reader.collect().unwrap(), "ops").unwrap_or(0);
    assert_eq!(harvested, 40_000);
}

#[test]
fn scopes_are_distinct_per_version() {
    let (reader, provider) = setup(Temporality::Cumulative);
    provider.meter("lib").i64_counter("a").init().add(1);
    provider
        .versioned_meter("lib", Some("2.0"), None)
        .i64_counter("a")
        .init()
        .add(1);
    provider.meter("lib").i64_counter("a").init().add(1);

    let metrics = reader.collect().unwrap();
    assert_eq!(metrics.scopes().len(), 2);
    assert_eq!(metrics.scopes()[1].library().version.as_deref(), Some("2.0"));
    assert_eq!(i64_value(&metrics, "a"), Some(2));
    assert_eq!(metrics.resource().len(), 1);
}
