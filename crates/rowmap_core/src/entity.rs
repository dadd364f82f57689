//! In-memory entity with existence, dirty, and error state.

use crate::error::MapperResult;
use crate::model::ModelCore;
use crate::options::{DeleteOptions, SaveOptions};
use crate::validator::FieldErrors;
use rowmap_value::{Record, Value};
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// One in-memory record, mapped to at most one storage row.
///
/// An entity is a mutable bag of fields plus lifecycle state: whether a
/// corresponding storage row is known to exist, which fields changed
/// since load or save, and the validation errors of the last failed
/// save. Entities are produced by their mapper (`create` for new
/// records, finds for loaded ones) and carry a back-reference to it, so
/// [`Entity::save`] and [`Entity::delete`] route to the owning mapper
/// without the caller holding it.
///
/// A successful delete latches the entity: further persistence fails.
#[derive(Clone)]
pub struct Entity {
    pub(crate) mapper: Arc<ModelCore>,
    pub(crate) data: Record,
    pub(crate) exists: bool,
    pub(crate) modified: BTreeSet<String>,
    pub(crate) errors: FieldErrors,
    pub(crate) deleted: bool,
}

impl Entity {
    /// Creates an entity owned by a mapper core.
    ///
    /// A new (non-existing) entity starts with every initial field
    /// marked modified; an existing one starts clean.
    pub(crate) fn new(mapper: Arc<ModelCore>, data: Record, exists: bool) -> Self {
        let modified = if exists {
            BTreeSet::new()
        } else {
            data.keys().map(str::to_string).collect()
        };
        Self {
            mapper,
            data,
            exists,
            modified,
            errors: FieldErrors::new(),
            deleted: false,
        }
    }

    /// Returns the value of a field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    /// Sets a field, marking it modified.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        self.data.set(field.clone(), value);
        self.modified.insert(field);
    }

    /// Writes a field without touching the modified set. Used for
    /// storage-assigned values like generated identities.
    pub(crate) fn set_stored(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.data.set(field, value);
    }

    /// Borrows the entity's data.
    #[must_use]
    pub fn data(&self) -> &Record {
        &self.data
    }

    /// Consumes the entity, returning its data.
    #[must_use]
    pub fn into_record(self) -> Record {
        self.data
    }

    /// Whether a corresponding storage row is known to exist.
    #[must_use]
    pub const fn exists(&self) -> bool {
        self.exists
    }

    /// Whether a successful delete has made this entity unusable for
    /// further persistence.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// The fields changed since load or last save.
    #[must_use]
    pub const fn modified(&self) -> &BTreeSet<String> {
        &self.modified
    }

    /// Returns `true` if a field changed since load or last save.
    #[must_use]
    pub fn is_modified(&self, field: &str) -> bool {
        self.modified.contains(field)
    }

    /// Per-field messages from the last failed validation. Empty after
    /// a successful save.
    #[must_use]
    pub const fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// Returns `true` if the last validation pass found no errors.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Saves this entity through its owning mapper.
    ///
    /// Equivalent to `model.save(&mut entity, None, options)`.
    ///
    /// # Errors
    ///
    /// See [`crate::Model::save`].
    pub fn save(&mut self, options: &SaveOptions) -> MapperResult<bool> {
        let core = Arc::clone(&self.mapper);
        core.save_entity(self, None, options)
    }

    /// Deletes this entity's storage row through its owning mapper.
    ///
    /// Equivalent to `model.delete(&mut entity, options)`.
    ///
    /// # Errors
    ///
    /// See [`crate::Model::delete`].
    pub fn delete(&mut self, options: &DeleteOptions) -> MapperResult<bool> {
        let core = Arc::clone(&self.mapper);
        core.delete_entity(self, options)
    }

    /// Exports the entity's data as a JSON value, preserving field
    /// order in string form.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> MapperResult<serde_json::Value> {
        Ok(serde_json::to_value(&self.data)?)
    }
}

impl Serialize for Entity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.data.serialize(serializer)
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("data", &self.data)
            .field("exists", &self.exists)
            .field("modified", &self.modified)
            .field("errors", &self.errors)
            .field("deleted", &self.deleted)
            .finish_non_exhaustive()
    }
}
