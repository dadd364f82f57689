//! The data mapper.

use crate::config::ModelConfig;
use crate::entity::Entity;
use crate::error::{MapperError, MapperResult};
use crate::finder::{parse_dynamic, FinderDef, FinderRegistry, ResultShape};
use crate::observer::ModelObserver;
use crate::options::{DeleteOptions, RemoveOptions, SaveOptions};
use crate::query::QueryOptions;
use crate::validator::{Event, Validator};
use rowmap_storage::{AggregateKind, Conditions, QueryDescriptor, StorageBackend};
use rowmap_value::{Record, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// The shared, read-only state behind a [`Model`] and its entities.
pub(crate) struct ModelCore {
    pub(crate) config: ModelConfig,
    backend: Arc<dyn StorageBackend>,
    finders: FinderRegistry,
    validator: Validator,
    observers: Vec<Arc<dyn ModelObserver>>,
}

/// A generic data mapper over one source.
///
/// `Model` orchestrates create/find/save/update/delete against a
/// [`StorageBackend`], running validation and lifecycle observers on
/// the per-entity save path. It is a cheap-clone handle: clones share
/// the finder registry, validator, and observer list, all of which are
/// fixed at construction.
///
/// The mapper holds no per-call state. Every operation is an
/// independent unit of work; backend calls run synchronously on the
/// caller's thread, and racing savers get last-write-wins semantics
/// unless the backend enforces more.
///
/// # Example
///
/// ```rust
/// use rowmap_core::{Model, ModelConfig, QueryOptions, Rule, SaveOptions, Validator};
/// use rowmap_storage::MemoryBackend;
/// use rowmap_value::Record;
/// use std::sync::Arc;
///
/// let model = Model::builder(ModelConfig::new("posts"), Arc::new(MemoryBackend::new()))
///     .validator(Validator::new().rule("title", Rule::not_empty("title is required")))
///     .build();
///
/// let mut post = model.create(Record::new().field("title", "First post"));
/// assert!(model.save(&mut post, None, &SaveOptions::default()).unwrap());
///
/// let found = model.find_first(QueryOptions::new()).unwrap().unwrap();
/// assert_eq!(found.get("title"), post.get("title"));
/// ```
#[derive(Clone)]
pub struct Model {
    core: Arc<ModelCore>,
}

/// Builder for a [`Model`].
///
/// Finders, validation rules, and observers are fixed here; once
/// `build` runs, the mapper's configuration never changes.
pub struct ModelBuilder {
    config: ModelConfig,
    backend: Arc<dyn StorageBackend>,
    finders: FinderRegistry,
    validator: Validator,
    observers: Vec<Arc<dyn ModelObserver>>,
}

impl ModelBuilder {
    /// Registers a finder, replacing any existing one with the name.
    #[must_use]
    pub fn finder(mut self, name: impl Into<String>, def: FinderDef) -> Self {
        self.finders.register(name, def);
        self
    }

    /// Sets the validator.
    #[must_use]
    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// Appends a lifecycle observer. Observers fire in registration
    /// order.
    #[must_use]
    pub fn observer(mut self, observer: impl ModelObserver + 'static) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    /// Builds the mapper.
    #[must_use]
    pub fn build(self) -> Model {
        Model {
            core: Arc::new(ModelCore {
                config: self.config,
                backend: self.backend,
                finders: self.finders,
                validator: self.validator,
                observers: self.observers,
            }),
        }
    }
}

impl Model {
    /// Creates a mapper with built-in finders, no validation rules, and
    /// no observers.
    #[must_use]
    pub fn new(config: ModelConfig, backend: Arc<dyn StorageBackend>) -> Self {
        Self::builder(config, backend).build()
    }

    /// Starts building a mapper.
    #[must_use]
    pub fn builder(config: ModelConfig, backend: Arc<dyn StorageBackend>) -> ModelBuilder {
        ModelBuilder {
            config,
            backend,
            finders: FinderRegistry::with_builtins(),
            validator: Validator::new(),
            observers: Vec::new(),
        }
    }

    /// The mapper's configuration.
    #[must_use]
    pub fn config(&self) -> &ModelConfig {
        &self.core.config
    }

    /// Creates a new entity from initial data. Pure construction; no
    /// storage access. The entity does not exist until saved.
    #[must_use]
    pub fn create(&self, data: Record) -> Entity {
        Entity::new(Arc::clone(&self.core), data, false)
    }

    /// Creates an entity representing a known-existing row without
    /// fetching it. Saves dispatch as updates.
    #[must_use]
    pub fn create_existing(&self, data: Record) -> Entity {
        Entity::new(Arc::clone(&self.core), data, true)
    }

    /// Runs a named finder.
    ///
    /// The result shape depends on the finder: `all` yields entities,
    /// `first` at most one, `count` an integer, `list` key/display
    /// pairs.
    ///
    /// # Errors
    ///
    /// Fails with [`MapperError::UnknownFinder`] for unregistered
    /// names, [`MapperError::InvalidOption`] for malformed options, and
    /// propagates backend failures.
    pub fn find(&self, name: &str, options: QueryOptions) -> MapperResult<FindResult> {
        ModelCore::find(&self.core, name, options)
    }

    /// Runs the `all` finder.
    ///
    /// # Errors
    ///
    /// See [`Model::find`].
    pub fn find_all(&self, options: QueryOptions) -> MapperResult<EntityIter> {
        match self.find("all", options)? {
            FindResult::Entities(entities) => Ok(entities),
            other => Err(shape_mismatch("all", &other)),
        }
    }

    /// Runs the `first` finder.
    ///
    /// # Errors
    ///
    /// See [`Model::find`].
    pub fn find_first(&self, options: QueryOptions) -> MapperResult<Option<Entity>> {
        match self.find("first", options)? {
            FindResult::One(entity) => Ok(entity),
            other => Err(shape_mismatch("first", &other)),
        }
    }

    /// Runs the `count` finder.
    ///
    /// # Errors
    ///
    /// See [`Model::find`].
    pub fn count(&self, options: QueryOptions) -> MapperResult<u64> {
        match self.find("count", options)? {
            FindResult::Count(count) => Ok(count),
            other => Err(shape_mismatch("count", &other)),
        }
    }

    /// Runs the `list` finder.
    ///
    /// # Errors
    ///
    /// See [`Model::find`].
    pub fn list(&self, options: QueryOptions) -> MapperResult<Vec<(Value, Value)>> {
        match self.find("list", options)? {
            FindResult::Listing(pairs) => Ok(pairs),
            other => Err(shape_mismatch("list", &other)),
        }
    }

    /// Runs a finder by call name, resolving dynamic names.
    ///
    /// Registered names behave exactly like [`Model::find`] and take no
    /// positional values. A name matching the
    /// `find<Base>By<Field>And<Field>...` pattern is decomposed into
    /// its base finder plus equality conditions, with `values` bound to
    /// the named fields in order. Explicit conditions in `options` win
    /// over name-derived conditions on key collision.
    ///
    /// # Errors
    ///
    /// Fails with [`MapperError::UnknownFinder`] when neither the name
    /// nor its dynamic base resolves, and with
    /// [`MapperError::InvalidOption`] when the value count does not
    /// match the parsed fields.
    pub fn call(
        &self,
        name: &str,
        values: &[Value],
        options: QueryOptions,
    ) -> MapperResult<FindResult> {
        ModelCore::call(&self.core, name, values, options)
    }

    /// Saves an entity, merging `data` into it first when given.
    ///
    /// Unless disabled, validation runs with the event context derived
    /// from the entity (create when new, update when existing); on
    /// failure the entity's errors are populated and `Ok(false)`
    /// returns with storage untouched. Observers fire around the write
    /// unless callbacks are disabled. New entities dispatch as inserts
    /// and learn their backend-assigned identity; existing ones
    /// dispatch as updates sending only modified fields. A whitelist
    /// restricts the written fields for this call only.
    ///
    /// # Errors
    ///
    /// Fails when the entity was deleted, when an update finds no
    /// primary key value, and on backend failure.
    pub fn save(
        &self,
        entity: &mut Entity,
        data: Option<Record>,
        options: &SaveOptions,
    ) -> MapperResult<bool> {
        self.core.save_entity(entity, data, options)
    }

    /// Bulk-updates every row matching `conditions` with a field patch.
    ///
    /// This path **never runs the validator** and constructs no
    /// entities; callers needing checked writes must validate
    /// separately or save per entity.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn update(&self, data: Record, conditions: Conditions) -> MapperResult<bool> {
        self.core.update_bulk(data, conditions)
    }

    /// Bulk-deletes every row matching `conditions`.
    ///
    /// An unscoped call - `None` or empty conditions - fails closed
    /// with [`MapperError::InvalidOption`] unless the options confirm
    /// it. Deleting everything is possible, but never quiet.
    ///
    /// # Errors
    ///
    /// Fails on an unconfirmed unscoped call and propagates backend
    /// failures.
    pub fn remove(
        &self,
        conditions: Option<Conditions>,
        options: &RemoveOptions,
    ) -> MapperResult<bool> {
        self.core.remove_bulk(conditions, options)
    }

    /// Deletes the storage row identified by the entity's primary key.
    ///
    /// Returns `Ok(false)` when the entity does not exist - including
    /// the second delete of the same entity. Success clears `exists`
    /// and latches the entity against further persistence.
    ///
    /// # Errors
    ///
    /// Fails when the entity carries no primary key value and on
    /// backend failure.
    pub fn delete(&self, entity: &mut Entity, options: &DeleteOptions) -> MapperResult<bool> {
        self.core.delete_entity(entity, options)
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("source", &self.core.config.source)
            .finish_non_exhaustive()
    }
}

fn shape_mismatch(name: &str, got: &FindResult) -> MapperError {
    MapperError::invalid_operation(format!(
        "finder `{name}` yielded a {} result",
        got.shape_name()
    ))
}

impl ModelCore {
    /// Finds take `core: &Arc<Self>` rather than `&self` because found
    /// rows become entities holding the mapper back-reference.
    pub(crate) fn find(
        core: &Arc<Self>,
        name: &str,
        options: QueryOptions,
    ) -> MapperResult<FindResult> {
        let (shape, descriptor) = core.finders.resolve(name, &core.config, options)?;
        Self::execute_shaped(core, shape, &descriptor)
    }

    pub(crate) fn call(
        core: &Arc<Self>,
        name: &str,
        values: &[Value],
        mut options: QueryOptions,
    ) -> MapperResult<FindResult> {
        if core.finders.contains(name) {
            if !values.is_empty() {
                return Err(MapperError::invalid_option(format!(
                    "finder `{name}` takes no positional values"
                )));
            }
            return Self::find(core, name, options);
        }

        let Some(dynamic) = parse_dynamic(name) else {
            return Err(MapperError::unknown_finder(name));
        };
        if !core.finders.contains(&dynamic.base) {
            return Err(MapperError::unknown_finder(&dynamic.base));
        }
        if dynamic.fields.len() != values.len() {
            return Err(MapperError::invalid_option(format!(
                "dynamic finder `{name}` expects {} value(s), got {}",
                dynamic.fields.len(),
                values.len()
            )));
        }

        let mut conditions = Conditions::new();
        for (field, value) in dynamic.fields.iter().zip(values) {
            conditions.set(field.clone(), value.clone());
        }
        // Explicit conditions take precedence over name-derived ones.
        for (field, constraint) in options.conditions.iter() {
            conditions.set(field.clone(), constraint.clone());
        }
        options.conditions = conditions;

        Self::find(core, &dynamic.base, options)
    }

    fn execute_shaped(
        core: &Arc<Self>,
        shape: ResultShape,
        descriptor: &QueryDescriptor,
    ) -> MapperResult<FindResult> {
        match shape {
            ResultShape::Entities => {
                let rows = core.backend.execute_query(descriptor)?;
                Ok(FindResult::Entities(EntityIter {
                    rows: rows.into_iter(),
                    core: Arc::clone(core),
                }))
            }
            ResultShape::Single => {
                let rows = core.backend.execute_query(descriptor)?;
                let entity = rows
                    .into_iter()
                    .next()
                    .map(|row| Entity::new(Arc::clone(core), row, true));
                Ok(FindResult::One(entity))
            }
            ResultShape::Count => {
                let value = core
                    .backend
                    .execute_aggregate(descriptor, AggregateKind::Count)?;
                let count = value
                    .as_integer()
                    .and_then(|n| u64::try_from(n).ok())
                    .ok_or_else(|| {
                        MapperError::invalid_operation("backend returned a non-integer count")
                    })?;
                Ok(FindResult::Count(count))
            }
            ResultShape::Listing => {
                let rows = core.backend.execute_query(descriptor)?;
                let display = core.config.effective_display_field().to_string();
                let pairs = rows
                    .into_iter()
                    .map(|row| {
                        let key = row
                            .get(&core.config.primary_key)
                            .cloned()
                            .unwrap_or(Value::Null);
                        let value = row
                            .get(&display)
                            .filter(|v| !v.is_null())
                            .cloned()
                            .unwrap_or_else(|| key.clone());
                        (key, value)
                    })
                    .collect();
                Ok(FindResult::Listing(pairs))
            }
        }
    }

    pub(crate) fn save_entity(
        &self,
        entity: &mut Entity,
        data: Option<Record>,
        options: &SaveOptions,
    ) -> MapperResult<bool> {
        if entity.deleted {
            return Err(MapperError::invalid_operation(
                "entity was deleted and can no longer be saved",
            ));
        }

        if let Some(patch) = data {
            for (field, value) in patch {
                entity.set(field, value);
            }
        }

        if options.validate {
            let events = options.events.clone().unwrap_or_else(|| {
                vec![if entity.exists {
                    Event::Update
                } else {
                    Event::Create
                }]
            });
            let errors = self.validator.validate(entity.data(), &events);
            if !errors.is_empty() {
                debug!(
                    source = %self.config.source,
                    fields = errors.len(),
                    "validation failed; save aborted"
                );
                entity.errors = errors;
                return Ok(false);
            }
            entity.errors.clear();
        }

        if options.callbacks {
            for observer in &self.observers {
                if !observer.before_save(entity)? {
                    debug!(source = %self.config.source, "save aborted by observer");
                    return Ok(false);
                }
            }
        }

        let created = !entity.exists;
        let payload = self.save_payload(entity, options);
        let payload_fields: Vec<String> = payload.keys().map(str::to_string).collect();

        let saved = if created {
            let identity = self.backend.insert(&self.config.source, payload)?;
            entity.set_stored(self.config.primary_key.clone(), identity);
            true
        } else {
            let identity = entity
                .data()
                .get(&self.config.primary_key)
                .filter(|v| !v.is_null())
                .cloned()
                .ok_or_else(|| MapperError::missing_identity(&self.config.primary_key))?;
            self.backend
                .update_by_identity(&self.config.source, &identity, payload)?
        };

        if saved {
            entity.exists = true;
            // A whitelist ignores fields for this call only: what was
            // held back stays modified for the next save.
            match &options.whitelist {
                Some(_) => {
                    for field in payload_fields {
                        entity.modified.remove(&field);
                    }
                }
                None => entity.modified.clear(),
            }
            debug!(source = %self.config.source, created, "entity saved");
            if options.callbacks {
                for observer in &self.observers {
                    observer.after_save(entity, created);
                }
            }
        }

        Ok(saved)
    }

    /// The fields sent to storage for a save: all data for an insert,
    /// modified fields for an update, both filtered by the whitelist.
    fn save_payload(&self, entity: &Entity, options: &SaveOptions) -> Record {
        let mut payload = Record::new();
        for (field, value) in entity.data().iter() {
            if entity.exists && !entity.modified.contains(field) {
                continue;
            }
            if let Some(whitelist) = &options.whitelist {
                if !whitelist.iter().any(|allowed| allowed == field) {
                    continue;
                }
            }
            payload.set(field.clone(), value.clone());
        }
        payload
    }

    pub(crate) fn update_bulk(&self, data: Record, conditions: Conditions) -> MapperResult<bool> {
        let descriptor = QueryOptions::new()
            .conditions(conditions)
            .build(&self.config.source)?;
        debug!(
            source = %self.config.source,
            fields = data.len(),
            "bulk update; validation bypassed"
        );
        Ok(self.backend.update_by_query(&descriptor, data)?)
    }

    pub(crate) fn remove_bulk(
        &self,
        conditions: Option<Conditions>,
        options: &RemoveOptions,
    ) -> MapperResult<bool> {
        let conditions = conditions.unwrap_or_default();
        if conditions.is_empty() {
            if !options.confirm_unscoped {
                return Err(MapperError::invalid_option(
                    "unscoped remove refused: the conditions match every record; \
                     set `confirm_unscoped` to allow it",
                ));
            }
            warn!(source = %self.config.source, "unscoped remove: deleting every record");
        }

        let descriptor = QueryOptions::new()
            .conditions(conditions)
            .build(&self.config.source)?;
        Ok(self.backend.delete_by_query(&descriptor)?)
    }

    pub(crate) fn delete_entity(
        &self,
        entity: &mut Entity,
        options: &DeleteOptions,
    ) -> MapperResult<bool> {
        if !entity.exists || entity.deleted {
            return Ok(false);
        }

        let identity = entity
            .data()
            .get(&self.config.primary_key)
            .filter(|v| !v.is_null())
            .cloned()
            .ok_or_else(|| MapperError::missing_identity(&self.config.primary_key))?;

        if options.callbacks {
            for observer in &self.observers {
                if !observer.before_delete(entity)? {
                    debug!(source = %self.config.source, "delete aborted by observer");
                    return Ok(false);
                }
            }
        }

        let removed = self
            .backend
            .delete_by_identity(&self.config.source, &identity)?;

        if removed {
            entity.exists = false;
            entity.deleted = true;
            debug!(source = %self.config.source, identity = %identity, "entity deleted");
            if options.callbacks {
                for observer in &self.observers {
                    observer.after_delete(entity);
                }
            }
        }

        Ok(removed)
    }
}

impl fmt::Debug for ModelCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelCore")
            .field("config", &self.config)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

/// The result of a finder, shaped by its [`ResultShape`].
#[derive(Debug)]
pub enum FindResult {
    /// A lazy, finite sequence of entities in retrieval order.
    Entities(EntityIter),
    /// At most one entity.
    One(Option<Entity>),
    /// An aggregate row count.
    Count(u64),
    /// Primary-key to display-field pairs in retrieval order.
    Listing(Vec<(Value, Value)>),
}

impl FindResult {
    /// Returns the entity sequence, if this is an `Entities` result.
    #[must_use]
    pub fn into_entities(self) -> Option<EntityIter> {
        match self {
            FindResult::Entities(entities) => Some(entities),
            _ => None,
        }
    }

    /// Returns the single entity, if this is a `One` result.
    #[must_use]
    pub fn into_one(self) -> Option<Entity> {
        match self {
            FindResult::One(entity) => entity,
            _ => None,
        }
    }

    /// Returns the count, if this is a `Count` result.
    #[must_use]
    pub const fn as_count(&self) -> Option<u64> {
        match self {
            FindResult::Count(count) => Some(*count),
            _ => None,
        }
    }

    /// Returns the listing pairs, if this is a `Listing` result.
    #[must_use]
    pub fn into_listing(self) -> Option<Vec<(Value, Value)>> {
        match self {
            FindResult::Listing(pairs) => Some(pairs),
            _ => None,
        }
    }

    const fn shape_name(&self) -> &'static str {
        match self {
            FindResult::Entities(_) => "sequence",
            FindResult::One(_) => "single-entity",
            FindResult::Count(_) => "count",
            FindResult::Listing(_) => "listing",
        }
    }
}

/// A lazy iterator over found entities.
///
/// Rows were fetched by the backing query; each is wrapped as an
/// existing entity on demand. The sequence is finite and restartable
/// only by re-invoking the find.
pub struct EntityIter {
    rows: std::vec::IntoIter<Record>,
    core: Arc<ModelCore>,
}

impl Iterator for EntityIter {
    type Item = Entity;

    fn next(&mut self) -> Option<Entity> {
        let row = self.rows.next()?;
        Some(Entity::new(Arc::clone(&self.core), row, true))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl ExactSizeIterator for EntityIter {}

impl fmt::Debug for EntityIter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityIter")
            .field("remaining", &self.rows.len())
            .finish_non_exhaustive()
    }
}
