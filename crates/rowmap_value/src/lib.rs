//! # RowMap Value
//!
//! Dynamic value and ordered record types for RowMap.
//!
//! This crate is the shared vocabulary of the RowMap workspace. A
//! [`Value`] is one dynamically-typed field value; a [`Record`] is an
//! insertion-ordered map of field names to values. Storage backends
//! return rows as records, the mapper hands them to callers as entity
//! data, and both serialize with field order intact.
//!
//! ## Usage
//!
//! ```
//! use rowmap_value::{Record, Value};
//!
//! let row = Record::new()
//!     .field("title", "First post")
//!     .field("views", 3i64);
//!
//! assert_eq!(row.get("views"), Some(&Value::Integer(3)));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod record;
mod value;

pub use record::Record;
pub use value::Value;
