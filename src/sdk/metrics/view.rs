//! Views override the aggregation the selector would choose for matching
//! instruments.
use crate::api::metrics::Descriptor;
use crate::sdk::metrics::selectors::Aggregate;
use crate::sdk::InstrumentationLibrary;

/// A rule applied when an instrument is created.
///
/// The instrument name pattern is either an exact name, `*` for every
/// instrument, or a prefix ending in `*` such as `http.*`.
#[derive(Clone, Debug, PartialEq)]
pub struct View {
    instrument_name: String,
    scope_name: Option<String>,
    aggregation: Aggregate,
}

impl View {
    /// A view applying `aggregation` to instruments matching `instrument_name`.
    pub fn new<T: Into<String>>(instrument_name: T, aggregation: Aggregate) -> Self {
        View {
            instrument_name: instrument_name.into(),
            scope_name: None,
            aggregation,
        }
    }

    /// Only match instruments of the scope with this name.
    pub fn with_scope_name<T: Into<String>>(self, scope_name: T) -> Self {
        View {
            scope_name: Some(scope_name.into()),
            ..self
        }
    }

    /// The aggregation this view selects.
    pub fn aggregation(&self) -> Aggregate {
        self.aggregation
    }

    /// Whether this view applies to `descriptor` created in `library`.
    pub fn matches(&self, library: &InstrumentationLibrary, descriptor: &Descriptor) -> bool {
        if let Some(scope_name) = &self.scope_name {
            if scope_name.as_str() != library.name {
                return false;
            }
        }

        match self.instrument_name.strip_suffix('*') {
            Some(prefix) => descriptor.name().starts_with(prefix),
            None => self.instrument_name == descriptor.name(),
        }
    }
}
