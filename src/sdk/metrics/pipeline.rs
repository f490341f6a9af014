use crate::api::metrics::{Descriptor, InstrumentKind};
use crate::sdk::export::metrics::{MetricReader, Temporality};
use crate::sdk::metrics::selectors::{Aggregate, AggregationSelector};
use crate::sdk::metrics::View;
use crate::sdk::InstrumentationLibrary;

/// What a provider decided at build time about its readers and views.
///
/// Reader `i` of the provider owns index `i` of every instrument's
/// per-reader state.
#[derive(Debug)]
pub(crate) struct Pipelines {
    temporalities: Vec<[Temporality; 5]>,
    views: Vec<View>,
    selector: Box<dyn AggregationSelector>,
}

impl Pipelines {
    pub(crate) fn new(
        readers: &[Box<dyn MetricReader>],
        views: Vec<View>,
        selector: Box<dyn AggregationSelector>,
    ) -> Self {
        let temporalities = readers
            .iter()
            .map(|reader| {
                let mut by_kind = [Temporality::Cumulative; 5];
                for kind in InstrumentKind::ALL.iter() {
                    by_kind[kind.index()] = reader.temporality(*kind);
                }
                by_kind
            })
            .collect();

        Pipelines {
            temporalities,
            views,
            selector,
        }
    }

    /// Temporality of every reader for instruments of `kind`, in reader order.
    pub(crate) fn temporalities(&self, kind: InstrumentKind) -> Vec<Temporality> {
        self.temporalities
            .iter()
            .map(|by_kind| by_kind[kind.index()])
            .collect()
    }

    /// The first matching view decides, the selector otherwise.
    pub(crate) fn aggregate_for(
        &self,
        library: &InstrumentationLibrary,
        descriptor: &Descriptor,
    ) -> Aggregate {
        self.views
            .iter()
            .find(|view| view.matches(library, descriptor))
            .map(View::aggregation)
            .unwrap_or_else(|| self.selector.aggregator_for(descriptor))
    }
}
