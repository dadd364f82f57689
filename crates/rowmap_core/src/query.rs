//! Query options and descriptor construction.
//!
//! [`QueryOptions`] is the caller-facing side of a query: a builder for
//! typed callers, plus [`QueryOptions::from_record`] for dynamic option
//! maps. Option validation lives here - the recognized key set and the
//! `page`-requires-`limit` invariant - so every descriptor a finder
//! hands to a backend was constructed from vetted options.

use crate::error::{MapperError, MapperResult};
use rowmap_storage::{Conditions, Constraint, Direction, QueryDescriptor};
use rowmap_value::{Record, Value};

/// Option keys recognized by [`QueryOptions::from_record`].
const RECOGNIZED_KEYS: [&str; 5] = ["conditions", "fields", "order", "limit", "page"];

/// Caller-supplied query options, validated before freezing into a
/// [`QueryDescriptor`].
///
/// # Example
///
/// ```rust
/// use rowmap_core::QueryOptions;
/// use rowmap_storage::Constraint;
///
/// let options = QueryOptions::new()
///     .condition("author", "michael")
///     .condition("views", Constraint::gt(10i64))
///     .order_desc("created")
///     .limit(20)
///     .page(2);
/// # let _ = options;
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub(crate) conditions: Conditions,
    pub(crate) fields: Vec<String>,
    pub(crate) order: Vec<(String, Direction)>,
    pub(crate) limit: Option<u64>,
    pub(crate) page: Option<u64>,
}

impl QueryOptions {
    /// Creates empty options: no conditions, all fields, no order,
    /// unbounded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field constraint.
    #[must_use]
    pub fn condition(mut self, field: impl Into<String>, constraint: impl Into<Constraint>) -> Self {
        self.conditions.set(field, constraint);
        self
    }

    /// Replaces the whole condition set.
    #[must_use]
    pub fn conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = conditions;
        self
    }

    /// Appends a field to the projection.
    #[must_use]
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.fields.push(field.into());
        self
    }

    /// Replaces the field projection.
    #[must_use]
    pub fn fields(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Appends an ascending order entry.
    #[must_use]
    pub fn order_asc(mut self, field: impl Into<String>) -> Self {
        self.order.push((field.into(), Direction::Asc));
        self
    }

    /// Appends a descending order entry.
    #[must_use]
    pub fn order_desc(mut self, field: impl Into<String>) -> Self {
        self.order.push((field.into(), Direction::Desc));
        self
    }

    /// Sets the row limit.
    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the 1-based page. Requires a positive limit at build time.
    #[must_use]
    pub const fn page(mut self, page: u64) -> Self {
        self.page = Some(page);
        self
    }

    /// Parses options from a dynamic map.
    ///
    /// Recognized keys are exactly `conditions` (a map of field to
    /// value, matched by equality), `fields` (a text value or array of
    /// text), `order` (a map of field to `"ASC"`/`"DESC"`, a text
    /// value, or an array of text, defaulting to ascending), `limit`
    /// (a non-negative integer), and `page` (a positive integer).
    ///
    /// # Errors
    ///
    /// Fails with [`MapperError::InvalidOption`] on any unrecognized
    /// key or malformed value.
    pub fn from_record(record: &Record) -> MapperResult<Self> {
        let mut options = Self::new();

        for (key, value) in record.iter() {
            match key.as_str() {
                "conditions" => {
                    let map = value.as_map().ok_or_else(|| {
                        MapperError::invalid_option("`conditions` must be a map of field to value")
                    })?;
                    for (field, expected) in map.iter() {
                        options.conditions.set(field.clone(), expected.clone());
                    }
                }
                "fields" => {
                    options.fields = parse_field_list(value, "fields")?;
                }
                "order" => {
                    options.order = parse_order(value)?;
                }
                "limit" => {
                    let limit = value.as_integer().and_then(|n| u64::try_from(n).ok());
                    options.limit = Some(limit.ok_or_else(|| {
                        MapperError::invalid_option("`limit` must be a non-negative integer")
                    })?);
                }
                "page" => {
                    let page = value
                        .as_integer()
                        .and_then(|n| u64::try_from(n).ok())
                        .filter(|&n| n >= 1);
                    options.page = Some(page.ok_or_else(|| {
                        MapperError::invalid_option("`page` must be a positive integer")
                    })?);
                }
                other => {
                    return Err(MapperError::invalid_option(format!(
                        "unrecognized option key `{other}`; recognized keys are {RECOGNIZED_KEYS:?}"
                    )));
                }
            }
        }

        Ok(options)
    }

    /// Validates these options and freezes them into a descriptor over
    /// `source`.
    ///
    /// # Errors
    ///
    /// Fails with [`MapperError::InvalidOption`] when `page` is set
    /// without a positive `limit`, or when `page` is zero.
    pub fn build(self, source: &str) -> MapperResult<QueryDescriptor> {
        if let Some(page) = self.page {
            if page == 0 {
                return Err(MapperError::invalid_option("`page` must be positive"));
            }
            if self.limit.unwrap_or(0) == 0 {
                return Err(MapperError::invalid_option(
                    "`page` requires a positive `limit`",
                ));
            }
        }

        Ok(QueryDescriptor::new(source)
            .with_conditions(self.conditions)
            .with_fields(self.fields)
            .with_order(self.order)
            .with_limit(self.limit.unwrap_or(0))
            .with_page(self.page.unwrap_or(1)))
    }
}

fn parse_field_list(value: &Value, key: &str) -> MapperResult<Vec<String>> {
    match value {
        Value::Text(field) => Ok(vec![field.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_text().map(str::to_string).ok_or_else(|| {
                    MapperError::invalid_option(format!("`{key}` entries must be text"))
                })
            })
            .collect(),
        _ => Err(MapperError::invalid_option(format!(
            "`{key}` must be text or an array of text"
        ))),
    }
}

fn parse_order(value: &Value) -> MapperResult<Vec<(String, Direction)>> {
    match value {
        Value::Map(map) => map
            .iter()
            .map(|(field, dir)| {
                let dir = dir
                    .as_text()
                    .and_then(|s| s.parse::<Direction>().ok())
                    .ok_or_else(|| {
                        MapperError::invalid_option(format!(
                            "`order` direction for `{field}` must be ASC or DESC"
                        ))
                    })?;
                Ok((field.clone(), dir))
            })
            .collect(),
        other => Ok(parse_field_list(other, "order")?
            .into_iter()
            .map(|field| (field, Direction::Asc))
            .collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn builder_produces_descriptor() {
        let descriptor = QueryOptions::new()
            .condition("author", "michael")
            .field("title")
            .order_desc("created")
            .limit(10)
            .page(2)
            .build("posts")
            .unwrap();

        assert_eq!(descriptor.source(), "posts");
        assert_eq!(descriptor.limit(), 10);
        assert_eq!(descriptor.offset(), 10);
        assert_eq!(descriptor.fields(), ["title".to_string()]);
    }

    #[test]
    fn page_without_limit_fails() {
        let result = QueryOptions::new().page(2).build("posts");
        assert!(matches!(result, Err(MapperError::InvalidOption { .. })));
    }

    #[test]
    fn page_with_zero_limit_fails() {
        let result = QueryOptions::new().limit(0).page(2).build("posts");
        assert!(matches!(result, Err(MapperError::InvalidOption { .. })));
    }

    #[test]
    fn page_zero_fails() {
        let result = QueryOptions::new().limit(5).page(0).build("posts");
        assert!(matches!(result, Err(MapperError::InvalidOption { .. })));
    }

    #[test]
    fn limit_without_page_is_fine() {
        let descriptor = QueryOptions::new().limit(5).build("posts").unwrap();
        assert_eq!(descriptor.limit(), 5);
        assert_eq!(descriptor.offset(), 0);
    }

    #[test]
    fn from_record_accepts_recognized_keys() {
        let record = Record::new()
            .field(
                "conditions",
                Record::new().field("author", "michael"),
            )
            .field("fields", vec![Value::from("title"), Value::from("author")])
            .field("order", Record::new().field("created", "DESC"))
            .field("limit", 10i64)
            .field("page", 1i64);

        let options = QueryOptions::from_record(&record).unwrap();
        assert_eq!(options.conditions.len(), 1);
        assert_eq!(options.fields.len(), 2);
        assert_eq!(options.order, vec![("created".to_string(), Direction::Desc)]);
        assert_eq!(options.limit, Some(10));
        assert_eq!(options.page, Some(1));
    }

    #[test]
    fn from_record_rejects_unknown_key() {
        let record = Record::new().field("recursive", true);
        let result = QueryOptions::from_record(&record);
        assert!(matches!(result, Err(MapperError::InvalidOption { .. })));
    }

    #[test]
    fn from_record_rejects_negative_limit() {
        let record = Record::new().field("limit", -1i64);
        let result = QueryOptions::from_record(&record);
        assert!(matches!(result, Err(MapperError::InvalidOption { .. })));
    }

    #[test]
    fn from_record_rejects_zero_page() {
        let record = Record::new().field("page", 0i64);
        let result = QueryOptions::from_record(&record);
        assert!(matches!(result, Err(MapperError::InvalidOption { .. })));
    }

    #[test]
    fn from_record_order_shorthand() {
        let record = Record::new().field("order", "created");
        let options = QueryOptions::from_record(&record).unwrap();
        assert_eq!(options.order, vec![("created".to_string(), Direction::Asc)]);
    }

    #[test]
    fn from_record_bad_direction() {
        let record = Record::new().field("order", Record::new().field("created", "UPWARD"));
        assert!(QueryOptions::from_record(&record).is_err());
    }

    proptest! {
        #[test]
        fn only_recognized_keys_pass(key in "[a-z_]{1,12}") {
            let record = Record::new().field(key.clone(), 1i64);
            let accepted = QueryOptions::from_record(&record).is_ok();
            // An integer value satisfies `limit` and `page`; the other
            // recognized keys reject it, unrecognized keys fail outright.
            prop_assert_eq!(accepted, key == "limit" || key == "page");
            if !RECOGNIZED_KEYS.contains(&key.as_str()) {
                prop_assert!(!accepted);
            }
        }
    }
}
