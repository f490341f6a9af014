//! # Resource
//!
//! A `Resource` is an immutable representation of the entity producing
//! telemetry. Every snapshot a provider produces carries its resource.
//! Discovering attributes from the environment is left to the caller; this
//! type only holds and encodes them.
use crate::api::labels::{self, Encoder};
use crate::api::{Key, KeyValue, Value};

/// Describes an entity about which identifying information and metadata is
/// exposed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Resource {
    attrs: labels::Set,
}

impl Resource {
    /// Create a new `Resource` from key value pairs. When a key repeats the
    /// last value wins.
    pub fn new<T: IntoIterator<Item = KeyValue>>(kvs: T) -> Self {
        Resource {
            attrs: labels::Set::from(kvs.into_iter().collect::<Vec<_>>()),
        }
    }

    /// Create an empty resource
    pub fn empty() -> Self {
        Resource::default()
    }

    /// The resource applied when a provider is built without one.
    pub fn sdk_default() -> Self {
        Resource::new(vec![
            KeyValue::new("service.name", "unknown_service"),
            KeyValue::new("telemetry.sdk.language", "rust"),
            KeyValue::new("telemetry.sdk.name", "opentelemetry"),
            KeyValue::new("telemetry.sdk.version", env!("CARGO_PKG_VERSION")),
        ])
    }

    /// Look up the value of `key`.
    pub fn get(&self, key: &Key) -> Option<&Value> {
        self.attrs
            .iter()
            .find(|kv| &kv.key == key)
            .map(|kv| &kv.value)
    }

    /// Returns the number of attributes for this resource
    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    /// Returns `true` if the resource contains no attributes.
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Gets an iterator over the attributes of this resource, sorted by key.
    pub fn iter(&self) -> labels::Iter<'_> {
        self.attrs.iter()
    }

    /// Encoded attributes
    pub fn encoded(&self, encoder: &dyn Encoder) -> String {
        self.attrs.encoded(encoder)
    }
}
