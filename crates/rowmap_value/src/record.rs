//! Insertion-ordered field map.

use crate::value::Value;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// An insertion-ordered map of field name to [`Value`].
///
/// `Record` is the raw-row currency of RowMap: storage backends return
/// rows as records, and entities hold their data as one. Field order is
/// the order of first insertion and survives serialization, so exported
/// rows read the way they were written.
///
/// Overwriting a field with [`Record::set`] keeps its original position;
/// only brand-new fields append at the end.
///
/// # Example
///
/// ```rust
/// use rowmap_value::{Record, Value};
///
/// let mut row = Record::new()
///     .field("title", "First post")
///     .field("author", "michael");
/// row.set("title", "Edited post");
///
/// assert_eq!(row.get("title"), Some(&Value::from("Edited post")));
/// assert_eq!(row.keys().collect::<Vec<_>>(), vec!["title", "author"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    /// Creates a new empty record.
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Adds a field in builder style, replacing any existing value.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Returns the value of a field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    /// Sets a field, preserving its position if it already exists.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Removes a field, returning its value if present.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let index = self.fields.iter().position(|(k, _)| k == name)?;
        Some(self.fields.remove(index).1)
    }

    /// Returns `true` if the record has a field with this name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == name)
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter().map(|(k, v)| (k, v))
    }

    /// Iterates over field names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// Merges another record into this one.
    ///
    /// Fields from `other` overwrite matching fields in place; new
    /// fields append in `other`'s order.
    pub fn merge(&mut self, other: Record) {
        for (name, value) in other {
            self.set(name, value);
        }
    }

    /// Returns a new record containing only the named fields, in the
    /// requested order. Absent fields are skipped.
    #[must_use]
    pub fn project(&self, names: &[String]) -> Record {
        let mut out = Record::new();
        for name in names {
            if let Some(value) = self.get(name) {
                out.set(name.clone(), value.clone());
            }
        }
        out
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (name, value) in iter {
            record.set(name, value);
        }
        record
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = &'a (String, Value);
    type IntoIter = std::slice::Iter<'a, (String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

struct RecordVisitor;

impl<'de> Visitor<'de> for RecordVisitor {
    type Value = Record;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a map of field names to values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Record, A::Error> {
        let mut record = Record::new();
        while let Some((name, value)) = access.next_entry::<String, Value>()? {
            record.set(name, value);
        }
        Ok(record)
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RecordVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get() {
        let mut record = Record::new();
        record.set("title", "hello");
        record.set("views", 3i64);

        assert_eq!(record.get("title"), Some(&Value::from("hello")));
        assert_eq!(record.get("views"), Some(&Value::Integer(3)));
        assert_eq!(record.get("missing"), None);
    }

    #[test]
    fn insertion_order_preserved() {
        let record = Record::new()
            .field("c", 1i64)
            .field("a", 2i64)
            .field("b", 3i64);

        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["c", "a", "b"]);
    }

    #[test]
    fn overwrite_keeps_position() {
        let mut record = Record::new().field("a", 1i64).field("b", 2i64);
        record.set("a", 10i64);

        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(record.get("a"), Some(&Value::Integer(10)));
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn remove_field() {
        let mut record = Record::new().field("a", 1i64).field("b", 2i64);

        assert_eq!(record.remove("a"), Some(Value::Integer(1)));
        assert_eq!(record.remove("a"), None);
        assert!(!record.contains("a"));
        assert!(record.contains("b"));
    }

    #[test]
    fn merge_overwrites_in_place() {
        let mut base = Record::new().field("a", 1i64).field("b", 2i64);
        let patch = Record::new().field("b", 20i64).field("c", 30i64);

        base.merge(patch);

        assert_eq!(base.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(base.get("b"), Some(&Value::Integer(20)));
    }

    #[test]
    fn project_keeps_requested_order() {
        let record = Record::new()
            .field("a", 1i64)
            .field("b", 2i64)
            .field("c", 3i64);

        let projected = record.project(&["c".into(), "a".into(), "x".into()]);
        assert_eq!(projected.keys().collect::<Vec<_>>(), vec!["c", "a"]);
    }

    #[test]
    fn from_iterator() {
        let record: Record = [("x", 1i64), ("y", 2i64)].into_iter().collect();
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("y"), Some(&Value::Integer(2)));
    }

    #[test]
    fn serializes_in_insertion_order() {
        let record = Record::new()
            .field("zeta", 1i64)
            .field("alpha", "two")
            .field("mid", Value::Null);

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"zeta":1,"alpha":"two","mid":null}"#);
    }

    #[test]
    fn deserializes_nested() {
        let json = r#"{"name":"a","tags":["x","y"],"meta":{"n":1}}"#;
        let record: Record = serde_json::from_str(json).unwrap();

        assert_eq!(record.get("name"), Some(&Value::from("a")));
        assert_eq!(
            record.get("tags"),
            Some(&Value::Array(vec![Value::from("x"), Value::from("y")]))
        );
        let meta = record.get("meta").and_then(Value::as_map).unwrap();
        assert_eq!(meta.get("n"), Some(&Value::Integer(1)));
    }
}
