//! OpenTelemetry Labels
use crate::api::KeyValue;
use std::collections::BTreeMap;

mod encoder;
pub use encoder::{default_encoder, DefaultLabelEncoder, Encoder};

/// Set is the representation for a distinct label set. It manages an
/// immutable set of labels sorted by key, with at most one value per key.
///
/// This type is used to implement:
/// 1. Resource attributes
/// 2. Encoded attribute output of exporters
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Set {
    equivalent: Distinct,
}

impl From<&[KeyValue]> for Set {
    fn from(kvs: &[KeyValue]) -> Self {
        Set {
            equivalent: Distinct::from(kvs),
        }
    }
}

impl From<Vec<KeyValue>> for Set {
    fn from(kvs: Vec<KeyValue>) -> Self {
        Set::from(kvs.as_slice())
    }
}

impl Set {
    /// Whether the set holds no labels.
    pub fn is_empty(&self) -> bool {
        self.equivalent.0.is_empty()
    }

    /// Number of labels in the set.
    pub fn len(&self) -> usize {
        self.equivalent.0.len()
    }

    /// Iterate over the labels in key order.
    pub fn iter(&self) -> Iter<'_> {
        self.into_iter()
    }

    /// Encode the set with the given encoder, returning an empty string when
    /// the set is empty.
    pub fn encoded(&self, encoder: &dyn Encoder) -> String {
        if self.is_empty() {
            return String::new();
        }
        encoder.encode(&mut self.iter())
    }
}

impl<'a> IntoIterator for &'a Set {
    type Item = &'a KeyValue;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        Iter(self.equivalent.0.iter())
    }
}

/// An iterator over the entries of a `Set`.
#[derive(Debug)]
pub struct Iter<'a>(std::slice::Iter<'a, KeyValue>);

impl<'a> Iterator for Iter<'a> {
    type Item = &'a KeyValue;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}

/// Distinct wraps a variable-size array of `KeyValue`, constructed with keys
/// in sorted order. When a key is repeated the last value given wins.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Distinct(Vec<KeyValue>);

impl From<&[KeyValue]> for Distinct {
    fn from(kvs: &[KeyValue]) -> Self {
        let deduped = kvs
            .iter()
            .map(|kv| (kv.key.clone(), kv.clone()))
            .collect::<BTreeMap<_, _>>();

        Distinct(deduped.into_iter().map(|(_, kv)| kv).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorted_and_last_value_wins() {
        let set = Set::from(vec![
            KeyValue::new("b", 1i64),
            KeyValue::new("a", "x"),
            KeyValue::new("b", 2i64),
        ]);

        let keys: Vec<&str> = set.iter().map(|kv| kv.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(set.encoded(&DefaultLabelEncoder), "a=x,b=2");
    }

    #[test]
    fn empty_set_encodes_to_empty_string() {
        assert_eq!(Set::default().encoded(&DefaultLabelEncoder), "");
    }
}
