use crate::api::metrics::{Config, InstrumentKind, NumberKind};

/// Descriptor contains all the settings that describe an instrument, including
/// its name, metric kind, number kind, and the configurable options.
#[derive(Clone, Debug, PartialEq)]
pub struct Descriptor {
    name: String,
    instrument_kind: InstrumentKind,
    number_kind: NumberKind,
    config: Config,
}

impl Descriptor {
    /// Create a new descriptor
    pub fn new(
        name: String,
        instrument_kind: InstrumentKind,
        number_kind: NumberKind,
        config: Config,
    ) -> Self {
        Descriptor {
            name,
            instrument_kind,
            number_kind,
            config,
        }
    }

    /// The metric instrument's name.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// The specific kind of instrument.
    pub fn instrument_kind(&self) -> InstrumentKind {
        self.instrument_kind
    }

    /// NumberKind returns whether this instrument is declared over i64 or f64
    /// values.
    pub fn number_kind(&self) -> NumberKind {
        self.number_kind
    }

    /// A human-readable description of the metric instrument.
    pub fn description(&self) -> Option<&String> {
        self.config.description.as_ref()
    }

    /// Unit describes the units of the metric instrument.
    pub fn unit(&self) -> Option<&str> {
        self.config.unit.as_ref().map(|unit| unit.as_ref())
    }

    /// Whether `other` names the same instrument within one scope: equal
    /// kind, number kind and unit. Names are compared by the caller and the
    /// description plays no part.
    pub fn same_identity(&self, other: &Descriptor) -> bool {
        self.instrument_kind == other.instrument_kind
            && self.number_kind == other.number_kind
            && self.unit().unwrap_or("") == other.unit().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Unit;

    fn descriptor(unit: Option<&'static str>, description: Option<&str>) -> Descriptor {
        Descriptor::new(
            "requests".into(),
            InstrumentKind::Counter,
            NumberKind::I64,
            Config::new(description.map(Into::into), unit.map(Unit::new)),
        )
    }

    #[test]
    fn description_is_not_identity() {
        let a = descriptor(Some("1"), Some("first"));
        let b = descriptor(Some("1"), Some("second"));
        assert!(a.same_identity(&b));
    }

    #[test]
    fn unit_is_identity() {
        assert!(!descriptor(Some("ms"), None).same_identity(&descriptor(Some("s"), None)));
        assert!(descriptor(Some(""), None).same_identity(&descriptor(None, None)));
    }
}
