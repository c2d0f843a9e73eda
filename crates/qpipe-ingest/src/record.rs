//! Tabular record type

use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// One row of an input file, keyed by the file's header.
///
/// Fields keep the order of the header. Equality compares the mapping only,
/// so two records with the same fields in a different order are equal.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Record(IndexMap<String, String>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl Eq for Record {}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Deserializes a flat object of strings, rejecting repeated field names
impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = Record;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of string fields")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Record, A::Error> {
                let mut fields = IndexMap::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((field, value)) = map.next_entry::<String, String>()? {
                    match fields.entry(field) {
                        Entry::Occupied(entry) => {
                            return Err(de::Error::custom(format_args!(
                                "duplicate field `{}`",
                                entry.key()
                            )));
                        },
                        Entry::Vacant(entry) => {
                            entry.insert(value);
                        },
                    }
                }
                Ok(Record(fields))
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_is_kept() {
        let record: Record = [("country", "France"), ("code", "FR"), ("region", "EU")]
            .into_iter()
            .collect();
        assert_eq!(record.fields().collect::<Vec<_>>(), ["country", "code", "region"]);
    }

    #[test]
    fn test_equality_ignores_order() {
        let a: Record = [("a", "1"), ("b", "2")].into_iter().collect();
        let b: Record = [("b", "2"), ("a", "1")].into_iter().collect();
        let c: Record = [("a", "1"), ("b", "3")].into_iter().collect();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_deserialize_keeps_field_order() {
        let record: Record = serde_json::from_str(r#"{"b":"2","a":"1"}"#).unwrap();
        assert_eq!(record.fields().collect::<Vec<_>>(), ["b", "a"]);
    }

    #[test]
    fn test_deserialize_rejects_duplicate_fields() {
        let err = serde_json::from_str::<Record>(r#"{"country":"A","country":"B"}"#).unwrap_err();
        assert!(err.to_string().contains("duplicate field `country`"));
    }
}
