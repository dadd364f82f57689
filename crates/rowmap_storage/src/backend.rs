//! Storage backend trait definition.

use crate::descriptor::{AggregateKind, QueryDescriptor};
use crate::error::StorageResult;
use rowmap_value::{Record, Value};

/// A row-level storage backend for RowMap.
///
/// Storage backends are **opaque query executors**. They receive frozen
/// [`QueryDescriptor`]s and raw [`Record`] rows; the mapper owns option
/// validation, finder resolution, entity lifecycle, and validation.
/// Backends interpret nothing beyond the descriptor itself.
///
/// # Invariants
///
/// - `execute_query` returns rows in a stable retrieval order: the
///   descriptor's `order` when present, otherwise backend-defined
///   (typically physical/storage order)
/// - `insert` returns the identity of the new row, generating one when
///   the row carries none
/// - Write operations return a success flag; hard failures are errors
/// - Condition values are data and must be quoted/escaped by backends
///   that compile queries to text; field and order names pass through
///   unescaped
/// - Backends must be `Send + Sync`; interior locking is the
///   implementor's concern, all methods take `&self`
///
/// # Implementors
///
/// - [`super::MemoryBackend`] - For tests and ephemeral data
pub trait StorageBackend: Send + Sync {
    /// Executes a query and returns the matching rows.
    ///
    /// Conditions, order, pagination, and field projection all apply.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to execute the query.
    fn execute_query(&self, query: &QueryDescriptor) -> StorageResult<Vec<Record>>;

    /// Computes an aggregate over the rows matching the query's
    /// conditions.
    ///
    /// Pagination and projection do not apply to aggregates.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to execute the query.
    fn execute_aggregate(
        &self,
        query: &QueryDescriptor,
        kind: AggregateKind,
    ) -> StorageResult<Value>;

    /// Inserts a row into a source and returns its identity.
    ///
    /// A row that already carries an identity keeps it; otherwise the
    /// backend assigns one and the returned value reflects it.
    ///
    /// # Errors
    ///
    /// Returns an error if the identity already exists or the write
    /// fails.
    fn insert(&self, source: &str, row: Record) -> StorageResult<Value>;

    /// Applies a field patch to the row with the given identity.
    ///
    /// Returns `false` if no such row exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn update_by_identity(
        &self,
        source: &str,
        identity: &Value,
        patch: Record,
    ) -> StorageResult<bool>;

    /// Applies a field patch to every row matching the query's
    /// conditions.
    ///
    /// The returned flag reports write success, not the match count; a
    /// patch matching zero rows still succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn update_by_query(&self, query: &QueryDescriptor, patch: Record) -> StorageResult<bool>;

    /// Deletes the row with the given identity.
    ///
    /// Returns `false` if no such row exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn delete_by_identity(&self, source: &str, identity: &Value) -> StorageResult<bool>;

    /// Deletes every row matching the query's conditions.
    ///
    /// The returned flag reports write success, not the match count.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn delete_by_query(&self, query: &QueryDescriptor) -> StorageResult<bool>;
}
