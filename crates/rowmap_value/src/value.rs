//! Dynamic field value type.

use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A dynamic field value.
///
/// This type represents any value a mapped record can carry. Rows move
/// through the mapper as maps of field name to `Value`, so backends and
/// callers share one vocabulary without a schema.
///
/// # Ordering
///
/// `Value` carries floats, so it implements `PartialEq` but not `Eq`.
/// Query-level ordering (`order` clauses, range constraints) goes through
/// [`Value::compare`], which is total: values are ranked by type first,
/// then compared within the type. Integers and floats share the numeric
/// rank and compare numerically.
///
/// # Serialization
///
/// Values serialize untagged: `Null` becomes JSON `null`, numbers become
/// numbers, and so on. JSON has no byte-string type, so `Bytes` exports
/// as an array of integers and re-imports as `Array`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer (full i64 range).
    Integer(i64),
    /// Floating-point value.
    Float(f64),
    /// Text string (UTF-8).
    Text(String),
    /// Array of values.
    Array(Vec<Value>),
    /// Nested record (ordered field map).
    Map(Record),
    /// Byte string.
    Bytes(Vec<u8>),
}

impl Value {
    /// Returns `true` if this is [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the boolean value, if this is a [`Value::Bool`].
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer value, if this is a [`Value::Integer`].
    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the float value, if this is a [`Value::Float`].
    #[must_use]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the numeric value as `f64` for integers and floats.
    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the text value, if this is a [`Value::Text`].
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the byte string, if this is a [`Value::Bytes`].
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the array elements, if this is a [`Value::Array`].
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Returns the nested record, if this is a [`Value::Map`].
    #[must_use]
    pub fn as_map(&self) -> Option<&Record> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Returns `true` if the value is empty in the validation sense.
    ///
    /// Null, the empty string, the empty array, the empty map, and the
    /// empty byte string are all empty. Every other value, including
    /// `false` and `0`, is non-empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.is_empty(),
            Value::Array(a) => a.is_empty(),
            Value::Map(m) => m.is_empty(),
            Value::Bytes(b) => b.is_empty(),
            Value::Bool(_) | Value::Integer(_) | Value::Float(_) => false,
        }
    }

    /// Compares two values with the total ordering used by `order` clauses.
    ///
    /// Values of different types are ranked by type. Within a type the
    /// comparison is the natural one: booleans `false < true`, numbers
    /// numerically (integers and floats share a rank; floats compare via
    /// `total_cmp`), text and bytes lexicographically, arrays and maps
    /// element by element with length as the tie-break.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Ordering {
        let rank = self.rank();
        if rank != other.rank() {
            return rank.cmp(&other.rank());
        }

        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Integer(a), Value::Float(b)) => (*a as f64).total_cmp(b),
            (Value::Float(a), Value::Integer(b)) => a.total_cmp(&(*b as f64)),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            (Value::Array(a), Value::Array(b)) => {
                for (av, bv) in a.iter().zip(b.iter()) {
                    let ord = av.compare(bv);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (Value::Map(a), Value::Map(b)) => {
                for ((ak, av), (bk, bv)) in a.iter().zip(b.iter()) {
                    let key_ord = ak.cmp(bk);
                    if key_ord != Ordering::Equal {
                        return key_ord;
                    }
                    let val_ord = av.compare(bv);
                    if val_ord != Ordering::Equal {
                        return val_ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            // Unreachable: same rank implies one of the arms above.
            _ => Ordering::Equal,
        }
    }

    /// Type rank for cross-type ordering.
    const fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Integer(_) | Value::Float(_) => 2,
            Value::Text(_) => 3,
            Value::Bytes(_) => 4,
            Value::Array(_) => 5,
            Value::Map(_) => 6,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Array(a) => write!(f, "<array of {}>", a.len()),
            Value::Map(m) => write!(f, "<map of {}>", m.len()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(a: Vec<Value>) -> Self {
        Value::Array(a)
    }
}

impl From<Record> for Value {
    fn from(m: Record) -> Self {
        Value::Map(m)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn accessors() {
        assert_eq!(Value::Integer(7).as_integer(), Some(7));
        assert_eq!(Value::Text("hi".into()).as_text(), Some("hi"));
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Float(1.5).as_float(), Some(1.5));
        assert!(Value::Null.is_null());
        assert_eq!(Value::Text("hi".into()).as_integer(), None);
    }

    #[test]
    fn number_coercion() {
        assert_eq!(Value::Integer(2).as_number(), Some(2.0));
        assert_eq!(Value::Float(2.5).as_number(), Some(2.5));
        assert_eq!(Value::Text("2".into()).as_number(), None);
    }

    #[test]
    fn emptiness() {
        assert!(Value::Null.is_empty());
        assert!(Value::Text(String::new()).is_empty());
        assert!(Value::Array(vec![]).is_empty());
        assert!(!Value::Bool(false).is_empty());
        assert!(!Value::Integer(0).is_empty());
        assert!(!Value::Text("x".into()).is_empty());
    }

    #[test]
    fn cross_type_rank() {
        let ordered = [
            Value::Null,
            Value::Bool(true),
            Value::Integer(9),
            Value::Text("a".into()),
            Value::Bytes(vec![1]),
            Value::Array(vec![]),
        ];
        for pair in ordered.windows(2) {
            assert_eq!(pair[0].compare(&pair[1]), Ordering::Less);
        }
    }

    #[test]
    fn numeric_cross_compare() {
        assert_eq!(Value::Integer(1).compare(&Value::Float(1.5)), Ordering::Less);
        assert_eq!(Value::Float(2.0).compare(&Value::Integer(2)), Ordering::Equal);
        assert_eq!(Value::Float(3.5).compare(&Value::Integer(3)), Ordering::Greater);
    }

    #[test]
    fn text_ordering_is_lexicographic() {
        assert_eq!(
            Value::Text("apple".into()).compare(&Value::Text("banana".into())),
            Ordering::Less
        );
        assert_eq!(
            Value::Text("b".into()).compare(&Value::Text("ab".into())),
            Ordering::Greater
        );
    }

    #[test]
    fn array_ordering_element_first() {
        let a = Value::Array(vec![Value::Integer(1), Value::Integer(2)]);
        let b = Value::Array(vec![Value::Integer(1), Value::Integer(3)]);
        let c = Value::Array(vec![Value::Integer(1)]);
        assert_eq!(a.compare(&b), Ordering::Less);
        assert_eq!(c.compare(&a), Ordering::Less);
    }

    #[test]
    fn from_conversions() {
        assert_eq!(Value::from(5i64), Value::Integer(5));
        assert_eq!(Value::from(5i32), Value::Integer(5));
        assert_eq!(Value::from("x"), Value::Text("x".into()));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(5i64)), Value::Integer(5));
    }

    #[test]
    fn display() {
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::Integer(42).to_string(), "42");
        assert_eq!(Value::Text("abc".into()).to_string(), "abc");
    }

    fn value_strategy() -> impl Strategy<Value = Value> {
        // Integers stay within the f64-exact range so mixed
        // integer/float comparisons are consistent.
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            (-(1i64 << 53)..(1i64 << 53)).prop_map(Value::Integer),
            any::<f64>().prop_map(Value::Float),
            "[a-z]{0,6}".prop_map(Value::Text),
            proptest::collection::vec(any::<u8>(), 0..4).prop_map(Value::Bytes),
        ];
        leaf.prop_recursive(2, 8, 4, |inner| {
            proptest::collection::vec(inner, 0..4).prop_map(Value::Array)
        })
    }

    proptest! {
        #[test]
        fn compare_is_antisymmetric(a in value_strategy(), b in value_strategy()) {
            prop_assert_eq!(a.compare(&b), b.compare(&a).reverse());
        }

        #[test]
        fn compare_is_transitive(
            a in value_strategy(),
            b in value_strategy(),
            c in value_strategy(),
        ) {
            let mut vals = [a, b, c];
            vals.sort_by(|x, y| x.compare(y));
            prop_assert!(vals[0].compare(&vals[2]) != Ordering::Greater);
        }

        #[test]
        fn compare_is_reflexive(a in value_strategy()) {
            prop_assert_eq!(a.compare(&a), Ordering::Equal);
        }
    }
}
