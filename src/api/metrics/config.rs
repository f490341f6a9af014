use crate::api::Unit;

/// Config contains some options for metrics of any kind.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Config {
    pub(crate) description: Option<String>,
    pub(crate) unit: Option<Unit>,
}

impl Config {
    /// Config with the given description and unit.
    pub fn new(description: Option<String>, unit: Option<Unit>) -> Self {
        Config { description, unit }
    }

    /// Description is an optional field describing the metric instrument.
    pub fn description(&self) -> Option<&String> {
        self.description.as_ref()
    }

    /// Unit is an optional field describing the metric instrument data.
    pub fn unit(&self) -> Option<&Unit> {
        self.unit.as_ref()
    }
}
