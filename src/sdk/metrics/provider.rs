//! # Meter Provider
//!
//! The provider is the root of the SDK. It owns the resource, the views and
//! the readers' temporality choices, hands out one [`Meter`] per
//! instrumentation scope and registers a [`Producer`] with every reader.
use crate::api::metrics::MetricsError;
use crate::api::Context;
use crate::global;
use crate::sdk::export::metrics::{
    MetricReader, Producer, ResourceMetrics, ScopeMetrics, Sequence,
};
use crate::sdk::metrics::pipeline::Pipelines;
use crate::sdk::metrics::selectors::{simple, AggregationSelector};
use crate::sdk::metrics::{Meter, View};
use crate::sdk::{InstrumentationLibrary, Resource};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

/// Hands out meters and collects them for its readers.
///
/// Clones share the same meters. A provider built without readers records
/// nothing.
#[derive(Clone, Debug)]
pub struct MeterProvider {
    shared: Arc<ProviderShared>,
}

/// State shared between a provider and the producers of its readers.
#[derive(Debug)]
struct ProviderShared {
    resource: Arc<Resource>,
    start_time: SystemTime,
    pipelines: Arc<Pipelines>,
    meters: Mutex<Meters>,
}

#[derive(Debug, Default)]
struct Meters {
    ordered: Arc<Vec<Meter>>,
    by_library: HashMap<InstrumentationLibrary, Meter>,
}

impl Default for MeterProvider {
    fn default() -> Self {
        MeterProvider::builder().build()
    }
}

impl MeterProvider {
    /// Configure a new provider.
    pub fn builder() -> MeterProviderBuilder {
        MeterProviderBuilder::default()
    }

    /// The meter of the scope `name` without version or schema URL.
    pub fn meter<T: Into<Cow<'static, str>>>(&self, name: T) -> Meter {
        let name: Cow<'static, str> = name.into();
        self.meter_with_library(InstrumentationLibrary::new(name, None, None))
    }

    /// The meter of the scope identified by all three fields.
    pub fn versioned_meter<T: Into<Cow<'static, str>>>(
        &self,
        name: T,
        version: Option<T>,
        schema_url: Option<T>,
    ) -> Meter {
        self.meter_with_library(InstrumentationLibrary::new(name, version, schema_url))
    }

    /// The meter of `library`, created on first request.
    ///
    /// Every request for an equal library returns the same meter.
    pub fn meter_with_library(&self, library: InstrumentationLibrary) -> Meter {
        let mut meters = self
            .shared
            .meters
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(meter) = meters.by_library.get(&library) {
            return meter.clone();
        }

        tracing::debug!(scope = %library.name, "creating meter");
        let meter = Meter::new(library.clone(), self.shared.pipelines.clone());
        Arc::make_mut(&mut meters.ordered).push(meter.clone());
        meters.by_library.insert(library, meter.clone());
        meter
    }

    /// The resource attached to every snapshot.
    pub fn resource(&self) -> &Resource {
        &self.shared.resource
    }
}

/// Configuration for a [`MeterProvider`].
#[derive(Debug, Default)]
pub struct MeterProviderBuilder {
    resource: Option<Resource>,
    readers: Vec<Box<dyn MetricReader>>,
    views: Vec<View>,
    selector: Option<Box<dyn AggregationSelector>>,
}

impl MeterProviderBuilder {
    /// The resource describing the entity producing telemetry. Defaults to
    /// `Resource::sdk_default()`.
    pub fn with_resource(self, resource: Resource) -> Self {
        MeterProviderBuilder {
            resource: Some(resource),
            ..self
        }
    }

    /// Add a reader. Readers are numbered in the order they are added.
    pub fn with_reader<R: MetricReader>(mut self, reader: R) -> Self {
        self.readers.push(Box::new(reader));
        self
    }

    /// Add a view. Views are tried in the order they are added.
    pub fn with_view(mut self, view: View) -> Self {
        self.views.push(view);
        self
    }

    /// Add several views.
    pub fn with_views<I: IntoIterator<Item = View>>(mut self, views: I) -> Self {
        self.views.extend(views);
        self
    }

    /// The selector used for instruments no view matches. Defaults to
    /// `simple::Selector::Inexpensive`.
    pub fn with_aggregation_selector<S>(self, selector: S) -> Self
    where
        S: AggregationSelector + 'static,
    {
        MeterProviderBuilder {
            selector: Some(Box::new(selector)),
            ..self
        }
    }

    /// Build the provider and register a producer with every reader.
    pub fn build(self) -> MeterProvider {
        let selector = self
            .selector
            .unwrap_or_else(|| Box::new(simple::Selector::default()));
        let pipelines = Arc::new(Pipelines::new(&self.readers, self.views, selector));
        let shared = Arc::new(ProviderShared {
            resource: Arc::new(self.resource.unwrap_or_else(Resource::sdk_default)),
            start_time: SystemTime::now(),
            pipelines,
            meters: Mutex::new(Meters::default()),
        });

        for (reader_idx, reader) in self.readers.iter().enumerate() {
            reader.register_producer(Box::new(ProviderProducer::new(shared.clone(), reader_idx)));
        }

        MeterProvider { shared }
    }
}

/// Collects every meter of a provider for one reader.
#[derive(Debug)]
struct ProviderProducer {
    provider: Arc<ProviderShared>,
    reader: usize,
    // held for the whole cycle, serializing this reader's collections
    last_collect: Mutex<SystemTime>,
}

impl ProviderProducer {
    fn new(provider: Arc<ProviderShared>, reader: usize) -> Self {
        let start_time = provider.start_time;
        ProviderProducer {
            provider,
            reader,
            last_collect: Mutex::new(start_time),
        }
    }

    fn ordered_meters(&self) -> Arc<Vec<Meter>> {
        self.provider
            .meters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .ordered
            .clone()
    }
}

impl Producer for ProviderProducer {
    fn produce(&self, cx: &Context) -> ResourceMetrics {
        let mut last_collect = self
            .last_collect
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let meters = self.ordered_meters();
        let sequence = Sequence {
            start: self.provider.start_time,
            last: *last_collect,
            now: SystemTime::now().max(*last_collect),
        };

        let mut scopes = Vec::with_capacity(meters.len());
        let mut cancelled = false;
        for meter in meters.iter() {
            if cx.is_done() {
                cancelled = true;
                break;
            }

            let (callbacks, instruments) = meter.snapshot();
            for callback in callbacks.iter() {
                if cx.is_done() {
                    cancelled = true;
                    break;
                }
                if let Err(err) = callback.run(cx, self.reader) {
                    global::handle_error(err);
                }
            }

            let mut output = Vec::new();
            if !cancelled {
                for instrument in instruments.iter() {
                    if cx.is_done() {
                        cancelled = true;
                        break;
                    }
                    instrument.collect(self.reader, &sequence, &mut output);
                }
            }
            scopes.push(ScopeMetrics::new(meter.library().clone(), output));

            if cancelled {
                break;
            }
        }

        // a cancelled cycle may leave values unharvested, the next delta
        // window has to cover the time they were recorded in
        if cancelled {
            global::handle_error(MetricsError::CollectionCancelled);
        } else {
            *last_collect = sequence.now;
        }
        tracing::debug!(
            reader = self.reader,
            scopes = scopes.len(),
            cancelled,
            "collection cycle complete"
        );

        ResourceMetrics::new(self.provider.resource.clone(), scopes)
    }
}
