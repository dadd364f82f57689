//! # RowMap Core
//!
//! Data mapper engine for RowMap.
//!
//! This crate provides:
//! - Query options and frozen descriptor construction
//! - A finder registry with built-in and dynamic finders
//! - Entities with existence, dirty, and error state
//! - Rule-based validation keyed by lifecycle events
//! - Lifecycle observers around save and delete
//! - The [`Model`] mapper orchestrating it all against a storage
//!   backend
//!
//! ## Usage
//!
//! ```rust
//! use rowmap_core::{Model, ModelConfig, QueryOptions, Rule, SaveOptions, Validator};
//! use rowmap_storage::MemoryBackend;
//! use rowmap_value::Record;
//! use std::sync::Arc;
//!
//! let model = Model::builder(ModelConfig::new("posts"), Arc::new(MemoryBackend::new()))
//!     .validator(Validator::new().rule("title", Rule::not_empty("title is required")))
//!     .build();
//!
//! // A new entity with a failing rule never reaches storage.
//! let mut empty = model.create(Record::new());
//! assert!(!model.save(&mut empty, None, &SaveOptions::default()).unwrap());
//! assert!(!empty.is_valid());
//!
//! // A valid one round-trips.
//! let mut post = model.create(Record::new().field("title", "First post"));
//! assert!(model.save(&mut post, None, &SaveOptions::default()).unwrap());
//! assert_eq!(model.count(QueryOptions::new()).unwrap(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod entity;
mod error;
mod finder;
mod model;
mod observer;
mod options;
mod query;
mod validator;

pub use config::ModelConfig;
pub use entity::Entity;
pub use error::{MapperError, MapperResult};
pub use finder::{parse_dynamic, DynamicFinder, FinderDef, FinderFn, FinderRegistry, ResultShape};
pub use model::{EntityIter, FindResult, Model, ModelBuilder};
pub use observer::ModelObserver;
pub use options::{DeleteOptions, RemoveOptions, SaveOptions};
pub use query::QueryOptions;
pub use validator::{AppliesTo, Event, FieldErrors, Rule, Validator};

// Re-exported so most applications depend on one crate.
pub use rowmap_storage::{
    AggregateKind, Conditions, Constraint, Direction, MemoryBackend, QueryDescriptor,
    StorageBackend, StorageError,
};
pub use rowmap_value::{Record, Value};
