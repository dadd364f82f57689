//! In-memory storage backend for testing.

use crate::backend::StorageBackend;
use crate::descriptor::{AggregateKind, Direction, QueryDescriptor};
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use rowmap_value::{Record, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use uuid::Uuid;

/// An in-memory storage backend.
///
/// This backend keeps every source as an insertion-ordered row list and
/// is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral data that doesn't need persistence
///
/// Sources are created on first insert. Rows are matched with
/// [`Value::compare`], so conditions behave like the reference semantics
/// other backends should implement. Unordered queries return rows in
/// insertion (physical) order.
///
/// # Identity
///
/// Each row's identity lives in a configurable identity field
/// (`"id"` by default). An insert without one gets a generated UUID
/// text value written into the row.
///
/// # Thread Safety
///
/// The backend is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use rowmap_storage::{MemoryBackend, QueryDescriptor, StorageBackend};
/// use rowmap_value::Record;
///
/// let backend = MemoryBackend::new();
/// backend.insert("posts", Record::new().field("title", "hello")).unwrap();
/// let rows = backend.execute_query(&QueryDescriptor::new("posts")).unwrap();
/// assert_eq!(rows.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryBackend {
    id_field: IdField,
    sources: RwLock<BTreeMap<String, Vec<Record>>>,
}

#[derive(Debug)]
struct IdField(String);

impl Default for IdField {
    fn default() -> Self {
        Self("id".to_string())
    }
}

impl MemoryBackend {
    /// Creates a new empty backend with `"id"` as the identity field.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new empty backend with a custom identity field.
    #[must_use]
    pub fn with_id_field(id_field: impl Into<String>) -> Self {
        Self {
            id_field: IdField(id_field.into()),
            sources: RwLock::new(BTreeMap::new()),
        }
    }

    /// Returns a copy of all rows in a source, in insertion order.
    ///
    /// Useful for testing and debugging.
    #[must_use]
    pub fn rows(&self, source: &str) -> Vec<Record> {
        self.sources
            .read()
            .get(source)
            .cloned()
            .unwrap_or_default()
    }

    /// Clears all sources.
    pub fn clear(&self) {
        self.sources.write().clear();
    }

    fn identity_of(&self, row: &Record) -> Option<Value> {
        row.get(&self.id_field.0)
            .filter(|v| !v.is_null())
            .cloned()
    }

    fn compare_rows(a: &Record, b: &Record, order: &[(String, Direction)]) -> Ordering {
        for (field, direction) in order {
            let av = a.get(field).unwrap_or(&Value::Null);
            let bv = b.get(field).unwrap_or(&Value::Null);
            let ord = direction.apply(av.compare(bv));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl StorageBackend for MemoryBackend {
    fn execute_query(&self, query: &QueryDescriptor) -> StorageResult<Vec<Record>> {
        let sources = self.sources.read();
        let rows = sources.get(query.source()).map(Vec::as_slice).unwrap_or(&[]);

        let mut matched: Vec<Record> = rows
            .iter()
            .filter(|row| query.conditions().matches(row))
            .cloned()
            .collect();

        if !query.order().is_empty() {
            matched.sort_by(|a, b| Self::compare_rows(a, b, query.order()));
        }

        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let mut page: Vec<Record> = if query.is_unbounded() {
            matched
        } else {
            let limit = usize::try_from(query.limit()).unwrap_or(usize::MAX);
            matched.into_iter().skip(offset).take(limit).collect()
        };

        if !query.fields().is_empty() {
            page = page
                .into_iter()
                .map(|row| row.project(query.fields()))
                .collect();
        }

        Ok(page)
    }

    fn execute_aggregate(
        &self,
        query: &QueryDescriptor,
        kind: AggregateKind,
    ) -> StorageResult<Value> {
        let sources = self.sources.read();
        let rows = sources.get(query.source()).map(Vec::as_slice).unwrap_or(&[]);

        match kind {
            AggregateKind::Count => {
                let count = rows
                    .iter()
                    .filter(|row| query.conditions().matches(row))
                    .count();
                let count = i64::try_from(count)
                    .map_err(|_| StorageError::backend("row count exceeds i64 range"))?;
                Ok(Value::Integer(count))
            }
        }
    }

    fn insert(&self, source: &str, mut row: Record) -> StorageResult<Value> {
        let mut sources = self.sources.write();
        let rows = sources.entry(source.to_string()).or_default();

        let identity = match self.identity_of(&row) {
            Some(identity) => {
                let duplicate = rows.iter().any(|existing| {
                    self.identity_of(existing)
                        .is_some_and(|id| id.compare(&identity) == Ordering::Equal)
                });
                if duplicate {
                    return Err(StorageError::DuplicateIdentity {
                        source: source.to_string(),
                        identity: identity.to_string(),
                    });
                }
                identity
            }
            None => {
                let generated = Value::Text(Uuid::new_v4().to_string());
                row.set(self.id_field.0.clone(), generated.clone());
                generated
            }
        };

        rows.push(row);
        Ok(identity)
    }

    fn update_by_identity(
        &self,
        source: &str,
        identity: &Value,
        patch: Record,
    ) -> StorageResult<bool> {
        let mut sources = self.sources.write();
        let Some(rows) = sources.get_mut(source) else {
            return Ok(false);
        };

        for row in rows.iter_mut() {
            let matches = self
                .identity_of(row)
                .is_some_and(|id| id.compare(identity) == Ordering::Equal);
            if matches {
                row.merge(patch);
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn update_by_query(&self, query: &QueryDescriptor, patch: Record) -> StorageResult<bool> {
        let mut sources = self.sources.write();
        if let Some(rows) = sources.get_mut(query.source()) {
            for row in rows.iter_mut() {
                if query.conditions().matches(row) {
                    row.merge(patch.clone());
                }
            }
        }
        Ok(true)
    }

    fn delete_by_identity(&self, source: &str, identity: &Value) -> StorageResult<bool> {
        let mut sources = self.sources.write();
        let Some(rows) = sources.get_mut(source) else {
            return Ok(false);
        };

        let index = rows.iter().position(|row| {
            self.identity_of(row)
                .is_some_and(|id| id.compare(identity) == Ordering::Equal)
        });
        match index {
            Some(index) => {
                rows.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_by_query(&self, query: &QueryDescriptor) -> StorageResult<bool> {
        let mut sources = self.sources.write();
        if let Some(rows) = sources.get_mut(query.source()) {
            rows.retain(|row| !query.conditions().matches(row));
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Conditions, Constraint};

    fn seed_posts(backend: &MemoryBackend) {
        for (id, author, views) in [(1i64, "michael", 10i64), (2, "sara", 25), (3, "michael", 5)] {
            backend
                .insert(
                    "posts",
                    Record::new()
                        .field("id", id)
                        .field("author", author)
                        .field("views", views),
                )
                .unwrap();
        }
    }

    #[test]
    fn insert_keeps_supplied_identity() {
        let backend = MemoryBackend::new();
        let identity = backend
            .insert("posts", Record::new().field("id", 7i64).field("title", "x"))
            .unwrap();
        assert_eq!(identity, Value::Integer(7));
    }

    #[test]
    fn insert_generates_identity_when_missing() {
        let backend = MemoryBackend::new();
        let identity = backend
            .insert("posts", Record::new().field("title", "x"))
            .unwrap();

        assert!(identity.as_text().is_some());
        // Generated identity is written back into the stored row.
        let rows = backend.rows("posts");
        assert_eq!(rows[0].get("id"), Some(&identity));
    }

    #[test]
    fn insert_duplicate_identity_fails() {
        let backend = MemoryBackend::new();
        backend
            .insert("posts", Record::new().field("id", 1i64))
            .unwrap();

        let result = backend.insert("posts", Record::new().field("id", 1i64));
        assert!(matches!(
            result,
            Err(StorageError::DuplicateIdentity { .. })
        ));
    }

    #[test]
    fn query_unknown_source_is_empty() {
        let backend = MemoryBackend::new();
        let rows = backend
            .execute_query(&QueryDescriptor::new("nowhere"))
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn query_filters_with_conditions() {
        let backend = MemoryBackend::new();
        seed_posts(&backend);

        let query = QueryDescriptor::new("posts")
            .with_conditions(Conditions::new().with("author", "michael"));
        let rows = backend.execute_query(&query).unwrap();

        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.get("author") == Some(&Value::from("michael"))));
    }

    #[test]
    fn query_range_conditions() {
        let backend = MemoryBackend::new();
        seed_posts(&backend);

        let query = QueryDescriptor::new("posts")
            .with_conditions(Conditions::new().with("views", Constraint::gte(10i64)));
        let rows = backend.execute_query(&query).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn query_orders_rows() {
        let backend = MemoryBackend::new();
        seed_posts(&backend);

        let query = QueryDescriptor::new("posts")
            .with_order(vec![("views".to_string(), Direction::Desc)]);
        let rows = backend.execute_query(&query).unwrap();

        let views: Vec<_> = rows.iter().map(|r| r.get("views").cloned()).collect();
        assert_eq!(
            views,
            vec![
                Some(Value::Integer(25)),
                Some(Value::Integer(10)),
                Some(Value::Integer(5))
            ]
        );
    }

    #[test]
    fn query_without_order_is_insertion_order() {
        let backend = MemoryBackend::new();
        seed_posts(&backend);

        let rows = backend.execute_query(&QueryDescriptor::new("posts")).unwrap();
        let ids: Vec<_> = rows.iter().filter_map(|r| r.get("id")?.as_integer()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn query_pagination() {
        let backend = MemoryBackend::new();
        for n in 1..=5i64 {
            backend
                .insert("nums", Record::new().field("id", n))
                .unwrap();
        }

        let query = QueryDescriptor::new("nums").with_limit(2).with_page(2);
        let rows = backend.execute_query(&query).unwrap();
        let ids: Vec<_> = rows.iter().filter_map(|r| r.get("id")?.as_integer()).collect();
        assert_eq!(ids, vec![3, 4]);
    }

    #[test]
    fn query_projects_fields() {
        let backend = MemoryBackend::new();
        seed_posts(&backend);

        let query = QueryDescriptor::new("posts").with_fields(vec!["author".to_string()]);
        let rows = backend.execute_query(&query).unwrap();

        assert!(rows.iter().all(|r| r.len() == 1 && r.contains("author")));
    }

    #[test]
    fn aggregate_count_ignores_pagination() {
        let backend = MemoryBackend::new();
        seed_posts(&backend);

        let query = QueryDescriptor::new("posts").with_limit(1);
        let count = backend
            .execute_aggregate(&query, AggregateKind::Count)
            .unwrap();
        assert_eq!(count, Value::Integer(3));
    }

    #[test]
    fn update_by_identity_merges_patch() {
        let backend = MemoryBackend::new();
        seed_posts(&backend);

        let patched = backend
            .update_by_identity(
                "posts",
                &Value::Integer(2),
                Record::new().field("views", 100i64),
            )
            .unwrap();
        assert!(patched);

        let rows = backend.rows("posts");
        let row = rows
            .iter()
            .find(|r| r.get("id") == Some(&Value::Integer(2)))
            .unwrap();
        assert_eq!(row.get("views"), Some(&Value::Integer(100)));
        assert_eq!(row.get("author"), Some(&Value::from("sara")));
    }

    #[test]
    fn update_by_identity_missing_row() {
        let backend = MemoryBackend::new();
        seed_posts(&backend);

        let patched = backend
            .update_by_identity("posts", &Value::Integer(99), Record::new())
            .unwrap();
        assert!(!patched);
    }

    #[test]
    fn update_by_query_patches_matches_only() {
        let backend = MemoryBackend::new();
        seed_posts(&backend);

        let query = QueryDescriptor::new("posts")
            .with_conditions(Conditions::new().with("author", "michael"));
        backend
            .update_by_query(&query, Record::new().field("flagged", true))
            .unwrap();

        let rows = backend.rows("posts");
        for row in rows {
            let flagged = row.get("flagged") == Some(&Value::Bool(true));
            let michael = row.get("author") == Some(&Value::from("michael"));
            assert_eq!(flagged, michael);
        }
    }

    #[test]
    fn delete_by_identity_removes_once() {
        let backend = MemoryBackend::new();
        seed_posts(&backend);

        assert!(backend
            .delete_by_identity("posts", &Value::Integer(1))
            .unwrap());
        assert!(!backend
            .delete_by_identity("posts", &Value::Integer(1))
            .unwrap());
        assert_eq!(backend.rows("posts").len(), 2);
    }

    #[test]
    fn delete_by_query_scoped() {
        let backend = MemoryBackend::new();
        seed_posts(&backend);

        let query = QueryDescriptor::new("posts")
            .with_conditions(Conditions::new().with("author", "michael"));
        backend.delete_by_query(&query).unwrap();

        let rows = backend.rows("posts");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("author"), Some(&Value::from("sara")));
    }

    #[test]
    fn delete_by_query_unconstrained_clears_source() {
        let backend = MemoryBackend::new();
        seed_posts(&backend);

        backend
            .delete_by_query(&QueryDescriptor::new("posts"))
            .unwrap();
        assert!(backend.rows("posts").is_empty());
    }

    #[test]
    fn custom_id_field() {
        let backend = MemoryBackend::with_id_field("uuid");
        let identity = backend
            .insert("posts", Record::new().field("title", "x"))
            .unwrap();

        let rows = backend.rows("posts");
        assert_eq!(rows[0].get("uuid"), Some(&identity));
        assert!(!rows[0].contains("id"));
    }

    #[test]
    fn clear_empties_all_sources() {
        let backend = MemoryBackend::new();
        seed_posts(&backend);
        backend.clear();
        assert!(backend.rows("posts").is_empty());
    }
}
