use crate::api::KeyValue;
use std::fmt;

/// Encoder is a mechanism for serializing a label set into a specific string
/// representation that supports caching, to avoid repeated serialization. An
/// example could be an exporter encoding the label set into a wire
/// representation.
pub trait Encoder: fmt::Debug {
    /// Encode returns the serialized encoding of the label
    /// set using its Iterator.
    fn encode(&self, labels: &mut dyn Iterator<Item = &KeyValue>) -> String;
}

/// Encodes labels as `key1=value1,key2=value2` in key order.
#[derive(Debug)]
pub struct DefaultLabelEncoder;

impl Encoder for DefaultLabelEncoder {
    fn encode(&self, labels: &mut dyn Iterator<Item = &KeyValue>) -> String {
        labels
            .enumerate()
            .fold(String::new(), |mut acc, (idx, kv)| {
                if idx > 0 {
                    acc.push(',')
                }
                acc.push_str(kv.key.as_str());
                acc.push('=');
                acc.push_str(kv.value.to_string().as_str());
                acc
            })
    }
}

/// The encoder used when an exporter is not configured with one.
pub fn default_encoder() -> Box<dyn Encoder + Send + Sync> {
    Box::new(DefaultLabelEncoder)
}
