use crate::api::metrics::{InstrumentKind, MetricsError, Result};
use crate::api::Context;
use crate::sdk::export::metrics::{
    MetricReader, Producer, ResourceMetrics, Temporality, TemporalitySelector,
};
use crate::sdk::metrics::controllers::ProducerSlot;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Returns a builder for a reader that collects on demand.
pub fn pull() -> PullControllerBuilder {
    PullControllerBuilder::default()
}

/// A reader that collects its provider whenever `collect` is called.
///
/// Clones share the same registration, add one clone to a provider and keep
/// another to collect with.
#[derive(Clone, Debug)]
pub struct PullController {
    inner: Arc<PullInner>,
}

#[derive(Debug)]
struct PullInner {
    producer: ProducerSlot,
    temporality: Box<dyn TemporalitySelector>,
    cache_period: Duration,
    cache: Mutex<Option<(Instant, ResourceMetrics)>>,
}

impl PullController {
    /// Run a collection cycle and return its snapshot.
    pub fn collect(&self) -> Result<ResourceMetrics> {
        self.collect_with_context(&Context::new())
    }

    /// Run a collection cycle bounded by `cx`.
    ///
    /// When a cache period is configured, a snapshot younger than the period
    /// is returned instead of collecting again.
    pub fn collect_with_context(&self, cx: &Context) -> Result<ResourceMetrics> {
        let mut cache = self.inner.cache.lock()?;
        if let Some((collected_at, metrics)) = cache.as_ref() {
            if collected_at.elapsed() < self.inner.cache_period {
                return Ok(metrics.clone());
            }
        }

        let producer = self.inner.producer.get().ok_or(MetricsError::NoProducer)?;
        let metrics = producer.produce(cx);
        if self.inner.cache_period > Duration::from_secs(0) {
            *cache = Some((Instant::now(), metrics.clone()));
        }
        Ok(metrics)
    }
}

impl TemporalitySelector for PullController {
    fn temporality(&self, kind: InstrumentKind) -> Temporality {
        self.inner.temporality.temporality(kind)
    }
}

impl MetricReader for PullController {
    fn register_producer(&self, producer: Box<dyn Producer>) {
        self.inner.producer.set(producer)
    }
}

/// Configuration for a [`PullController`].
#[derive(Debug)]
pub struct PullControllerBuilder {
    temporality: Box<dyn TemporalitySelector>,

    /// CachePeriod is the period which a recently-computed result
    /// will be returned without gathering metric data again.
    ///
    /// If the period is zero, caching of the result is disabled.
    cache_period: Duration,
}

impl Default for PullControllerBuilder {
    fn default() -> Self {
        PullControllerBuilder {
            temporality: Box::new(Temporality::Cumulative),
            cache_period: Duration::from_secs(0),
        }
    }
}

impl PullControllerBuilder {
    /// The temporality this reader asks for. Defaults to cumulative.
    pub fn with_temporality<T>(self, temporality: T) -> Self
    where
        T: TemporalitySelector + 'static,
    {
        PullControllerBuilder {
            temporality: Box::new(temporality),
            ..self
        }
    }

    /// Reuse a snapshot for this long before collecting again.
    pub fn with_cache_period(self, cache_period: Duration) -> Self {
        PullControllerBuilder {
            cache_period,
            ..self
        }
    }

    /// Build the reader. It must be added to a provider before collecting.
    pub fn build(self) -> PullController {
        PullController {
            inner: Arc::new(PullInner {
                producer: ProducerSlot::default(),
                temporality: self.temporality,
                cache_period: self.cache_period,
                cache: Mutex::new(None),
            }),
        }
    }
}
