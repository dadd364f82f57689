//! # RowMap Storage
//!
//! Storage backend contract and reference backend for RowMap.
//!
//! This crate defines the lowest-level abstraction of the RowMap
//! workspace. Storage backends are **opaque query executors**: they
//! receive frozen [`QueryDescriptor`]s and return raw [`Record`] rows.
//! The mapper owns everything else - option validation, finder
//! resolution, entity lifecycle, and field validation.
//!
//! ## Design Principles
//!
//! - Backends execute descriptors; they never see finder names, save
//!   options, or validation rules
//! - Condition values are data, never query text
//! - Must be `Send + Sync`; all methods take `&self` and interior
//!   locking is the implementor's concern
//!
//! ## Available Backends
//!
//! - [`MemoryBackend`] - For testing and ephemeral storage
//!
//! ## Example
//!
//! ```rust
//! use rowmap_storage::{Conditions, MemoryBackend, QueryDescriptor, StorageBackend};
//! use rowmap_value::Record;
//!
//! let backend = MemoryBackend::new();
//! backend.insert("posts", Record::new().field("author", "michael")).unwrap();
//!
//! let query = QueryDescriptor::new("posts")
//!     .with_conditions(Conditions::new().with("author", "michael"));
//! assert_eq!(backend.execute_query(&query).unwrap().len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod descriptor;
mod error;
mod memory;

pub use backend::StorageBackend;
pub use descriptor::{AggregateKind, Conditions, Constraint, Direction, QueryDescriptor};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryBackend;

// Re-exported so backend implementors depend on one crate.
pub use rowmap_value::{Record, Value};
