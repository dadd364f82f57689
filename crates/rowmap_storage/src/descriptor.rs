//! Frozen query representation shared between the mapper and backends.

use rowmap_value::{Record, Value};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Sort direction for an `order` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

impl Direction {
    /// Applies this direction to an ascending comparison result.
    #[must_use]
    pub const fn apply(self, ord: Ordering) -> Ordering {
        match self {
            Direction::Asc => ord,
            Direction::Desc => ord.reverse(),
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    /// Parses `"ASC"` or `"DESC"`, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(Direction::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Direction::Desc)
        } else {
            Err(format!("unrecognized sort direction `{s}`"))
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Asc => write!(f, "ASC"),
            Direction::Desc => write!(f, "DESC"),
        }
    }
}

/// A single field constraint.
///
/// Constraints compare against field values with [`Value::compare`], so
/// integers and floats match numerically. Backends must treat the
/// carried values as data, never as query text.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Field equals the value.
    Eq(Value),
    /// Field does not equal the value.
    Ne(Value),
    /// Field is strictly greater than the value.
    Gt(Value),
    /// Field is greater than or equal to the value.
    Gte(Value),
    /// Field is strictly less than the value.
    Lt(Value),
    /// Field is less than or equal to the value.
    Lte(Value),
    /// Field equals one of the values.
    In(Vec<Value>),
}

impl Constraint {
    /// Equality constraint.
    pub fn eq(value: impl Into<Value>) -> Self {
        Constraint::Eq(value.into())
    }

    /// Inequality constraint.
    pub fn ne(value: impl Into<Value>) -> Self {
        Constraint::Ne(value.into())
    }

    /// Greater-than constraint.
    pub fn gt(value: impl Into<Value>) -> Self {
        Constraint::Gt(value.into())
    }

    /// Greater-or-equal constraint.
    pub fn gte(value: impl Into<Value>) -> Self {
        Constraint::Gte(value.into())
    }

    /// Less-than constraint.
    pub fn lt(value: impl Into<Value>) -> Self {
        Constraint::Lt(value.into())
    }

    /// Less-or-equal constraint.
    pub fn lte(value: impl Into<Value>) -> Self {
        Constraint::Lte(value.into())
    }

    /// Membership constraint.
    pub fn one_of(values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Constraint::In(values.into_iter().map(Into::into).collect())
    }

    /// Evaluates this constraint against a field value.
    ///
    /// Absent fields are evaluated as [`Value::Null`] by callers.
    #[must_use]
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Constraint::Eq(expected) => value.compare(expected) == Ordering::Equal,
            Constraint::Ne(expected) => value.compare(expected) != Ordering::Equal,
            Constraint::Gt(expected) => value.compare(expected) == Ordering::Greater,
            Constraint::Gte(expected) => value.compare(expected) != Ordering::Less,
            Constraint::Lt(expected) => value.compare(expected) == Ordering::Less,
            Constraint::Lte(expected) => value.compare(expected) != Ordering::Greater,
            Constraint::In(allowed) => allowed
                .iter()
                .any(|v| value.compare(v) == Ordering::Equal),
        }
    }
}

impl From<Value> for Constraint {
    fn from(value: Value) -> Self {
        Constraint::Eq(value)
    }
}

impl From<&str> for Constraint {
    fn from(value: &str) -> Self {
        Constraint::Eq(Value::from(value))
    }
}

impl From<String> for Constraint {
    fn from(value: String) -> Self {
        Constraint::Eq(Value::from(value))
    }
}

impl From<i64> for Constraint {
    fn from(value: i64) -> Self {
        Constraint::Eq(Value::from(value))
    }
}

impl From<i32> for Constraint {
    fn from(value: i32) -> Self {
        Constraint::Eq(Value::from(value))
    }
}

impl From<f64> for Constraint {
    fn from(value: f64) -> Self {
        Constraint::Eq(Value::from(value))
    }
}

impl From<bool> for Constraint {
    fn from(value: bool) -> Self {
        Constraint::Eq(Value::from(value))
    }
}

/// An ordered, AND-combined set of field constraints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conditions {
    entries: Vec<(String, Constraint)>,
}

impl Conditions {
    /// Creates an empty condition set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Adds a constraint in builder style, replacing any existing
    /// constraint on the same field.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, constraint: impl Into<Constraint>) -> Self {
        self.set(field, constraint);
        self
    }

    /// Sets a field constraint, preserving its position on overwrite.
    pub fn set(&mut self, field: impl Into<String>, constraint: impl Into<Constraint>) {
        let field = field.into();
        let constraint = constraint.into();
        match self.entries.iter_mut().find(|(f, _)| *f == field) {
            Some(slot) => slot.1 = constraint,
            None => self.entries.push((field, constraint)),
        }
    }

    /// Returns the constraint on a field, if any.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Constraint> {
        self.entries
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, c)| c)
    }

    /// Returns `true` if no constraints are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of constraints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterates over constraints in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Constraint)> {
        self.entries.iter().map(|(f, c)| (f, c))
    }

    /// Evaluates all constraints against a row.
    ///
    /// Absent fields evaluate as [`Value::Null`]. An empty condition set
    /// matches every row.
    #[must_use]
    pub fn matches(&self, row: &Record) -> bool {
        self.entries
            .iter()
            .all(|(field, constraint)| constraint.matches(row.get(field).unwrap_or(&Value::Null)))
    }
}

impl<K: Into<String>, C: Into<Constraint>> FromIterator<(K, C)> for Conditions {
    fn from_iter<I: IntoIterator<Item = (K, C)>>(iter: I) -> Self {
        let mut conditions = Conditions::new();
        for (field, constraint) in iter {
            conditions.set(field, constraint);
        }
        conditions
    }
}

/// Aggregate kinds a backend can compute over a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateKind {
    /// Number of rows matching the conditions.
    Count,
}

/// An immutable, storage-agnostic representation of one query.
///
/// Descriptors carry everything a backend needs to execute a read or a
/// scoped write: the source (table or collection name), AND-combined
/// conditions, a field projection, sort order, and pagination.
///
/// The mapper builds descriptors through its option layer, which is
/// where option validation lives (unknown keys, `page` without a
/// positive `limit`). A hand-built descriptor with `page` set and
/// `limit` zero is simply unbounded: [`QueryDescriptor::offset`] is zero
/// whenever there is no limit.
///
/// # Security
///
/// Condition values are data and must be quoted/escaped by backends
/// that compile queries to text. Field and order names pass through
/// unescaped; callers must not place untrusted input there.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    source: String,
    conditions: Conditions,
    fields: Vec<String>,
    order: Vec<(String, Direction)>,
    limit: u64,
    page: u64,
}

impl QueryDescriptor {
    /// Creates an unconstrained descriptor over a source.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            conditions: Conditions::new(),
            fields: Vec::new(),
            order: Vec::new(),
            limit: 0,
            page: 1,
        }
    }

    /// Sets the condition set.
    #[must_use]
    pub fn with_conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = conditions;
        self
    }

    /// Sets the field projection. Empty means all fields.
    #[must_use]
    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = fields;
        self
    }

    /// Sets the sort order.
    #[must_use]
    pub fn with_order(mut self, order: Vec<(String, Direction)>) -> Self {
        self.order = order;
        self
    }

    /// Sets the row limit. Zero means unbounded.
    #[must_use]
    pub const fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the page (1-based). Only meaningful with a positive limit.
    #[must_use]
    pub const fn with_page(mut self, page: u64) -> Self {
        self.page = page;
        self
    }

    /// The source (table or collection) this query targets.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The AND-combined condition set.
    #[must_use]
    pub const fn conditions(&self) -> &Conditions {
        &self.conditions
    }

    /// The field projection. Empty means all fields.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// The sort order.
    #[must_use]
    pub fn order(&self) -> &[(String, Direction)] {
        &self.order
    }

    /// The row limit. Zero means unbounded.
    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.limit
    }

    /// The 1-based page.
    #[must_use]
    pub const fn page(&self) -> u64 {
        self.page
    }

    /// The effective row offset: `(page - 1) * limit`.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        if self.limit == 0 {
            0
        } else {
            (self.page - 1).saturating_mul(self.limit)
        }
    }

    /// Returns `true` if no row limit applies.
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.limit == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn direction_parsing() {
        assert_eq!("ASC".parse::<Direction>().unwrap(), Direction::Asc);
        assert_eq!("desc".parse::<Direction>().unwrap(), Direction::Desc);
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn direction_apply() {
        assert_eq!(
            Direction::Desc.apply(Ordering::Less),
            Ordering::Greater
        );
        assert_eq!(Direction::Asc.apply(Ordering::Less), Ordering::Less);
    }

    #[test]
    fn constraint_equality_is_numeric() {
        assert!(Constraint::eq(2i64).matches(&Value::Float(2.0)));
        assert!(!Constraint::eq(2i64).matches(&Value::Integer(3)));
        assert!(Constraint::ne("a").matches(&Value::from("b")));
    }

    #[test]
    fn constraint_ranges() {
        assert!(Constraint::gt(5i64).matches(&Value::Integer(6)));
        assert!(!Constraint::gt(5i64).matches(&Value::Integer(5)));
        assert!(Constraint::gte(5i64).matches(&Value::Integer(5)));
        assert!(Constraint::lt(5i64).matches(&Value::Integer(4)));
        assert!(Constraint::lte(5i64).matches(&Value::Integer(5)));
    }

    #[test]
    fn constraint_membership() {
        let c = Constraint::one_of(["draft", "review"]);
        assert!(c.matches(&Value::from("draft")));
        assert!(!c.matches(&Value::from("published")));
    }

    #[test]
    fn conditions_are_and_combined() {
        let conditions = Conditions::new()
            .with("author", "michael")
            .with("views", Constraint::gt(10i64));

        let hit = Record::new().field("author", "michael").field("views", 11i64);
        let miss = Record::new().field("author", "michael").field("views", 3i64);

        assert!(conditions.matches(&hit));
        assert!(!conditions.matches(&miss));
    }

    #[test]
    fn conditions_absent_field_is_null() {
        let conditions = Conditions::new().with("deleted_at", Value::Null);
        assert!(conditions.matches(&Record::new().field("title", "x")));
    }

    #[test]
    fn conditions_overwrite_keeps_position() {
        let mut conditions = Conditions::new().with("a", 1i64).with("b", 2i64);
        conditions.set("a", 9i64);

        let fields: Vec<_> = conditions.iter().map(|(f, _)| f.as_str()).collect();
        assert_eq!(fields, vec!["a", "b"]);
        assert_eq!(conditions.get("a"), Some(&Constraint::Eq(Value::Integer(9))));
    }

    #[test]
    fn empty_conditions_match_everything() {
        assert!(Conditions::new().matches(&Record::new()));
    }

    #[test]
    fn offset_computation() {
        let q = QueryDescriptor::new("posts").with_limit(10).with_page(3);
        assert_eq!(q.offset(), 20);

        let unbounded = QueryDescriptor::new("posts").with_page(3);
        assert_eq!(unbounded.offset(), 0);
        assert!(unbounded.is_unbounded());
    }

    #[test]
    fn descriptor_defaults() {
        let q = QueryDescriptor::new("posts");
        assert_eq!(q.source(), "posts");
        assert!(q.conditions().is_empty());
        assert!(q.fields().is_empty());
        assert!(q.order().is_empty());
        assert_eq!(q.limit(), 0);
        assert_eq!(q.page(), 1);
    }

    proptest! {
        #[test]
        fn range_constraints_agree_with_integer_order(a in -1000i64..1000, b in -1000i64..1000) {
            let v = Value::Integer(b);
            prop_assert_eq!(Constraint::gt(a).matches(&v), b > a);
            prop_assert_eq!(Constraint::gte(a).matches(&v), b >= a);
            prop_assert_eq!(Constraint::lt(a).matches(&v), b < a);
            prop_assert_eq!(Constraint::lte(a).matches(&v), b <= a);
            prop_assert_eq!(Constraint::eq(a).matches(&v), b == a);
        }

        #[test]
        fn eq_and_ne_are_complementary(a in -1000i64..1000, b in -1000i64..1000) {
            let v = Value::Integer(b);
            prop_assert_ne!(
                Constraint::eq(a).matches(&v),
                Constraint::ne(a).matches(&v)
            );
        }

        #[test]
        fn offset_never_applies_without_limit(page in 1u64..10_000) {
            let q = QueryDescriptor::new("posts").with_page(page);
            prop_assert_eq!(q.offset(), 0);
        }
    }
}
