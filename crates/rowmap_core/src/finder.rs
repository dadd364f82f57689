//! Named finders and dynamic finder-name parsing.

use crate::config::ModelConfig;
use crate::error::{MapperError, MapperResult};
use crate::query::QueryOptions;
use rowmap_storage::QueryDescriptor;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// How a finder's backend result is shaped for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    /// A sequence of entities.
    Entities,
    /// At most one entity.
    Single,
    /// An aggregate row count.
    Count,
    /// Primary-key to display-field pairs.
    Listing,
}

/// Finder build function: shapes caller options into a frozen
/// descriptor.
pub type FinderFn =
    Arc<dyn Fn(&ModelConfig, QueryOptions) -> MapperResult<QueryDescriptor> + Send + Sync>;

/// A named query template: a result shape plus a descriptor builder.
#[derive(Clone)]
pub struct FinderDef {
    shape: ResultShape,
    build: FinderFn,
}

impl FinderDef {
    /// Creates a finder definition.
    pub fn new(
        shape: ResultShape,
        build: impl Fn(&ModelConfig, QueryOptions) -> MapperResult<QueryDescriptor>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            shape,
            build: Arc::new(build),
        }
    }

    /// The result shape this finder produces.
    #[must_use]
    pub const fn shape(&self) -> ResultShape {
        self.shape
    }

    /// Builds the descriptor for a call.
    ///
    /// # Errors
    ///
    /// Propagates option validation failures from the build function.
    pub fn build_descriptor(
        &self,
        config: &ModelConfig,
        options: QueryOptions,
    ) -> MapperResult<QueryDescriptor> {
        (self.build)(config, options)
    }
}

impl fmt::Debug for FinderDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FinderDef")
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}

/// Registry of named finders.
///
/// Ships with the built-ins `all`, `first`, `count`, and `list`.
/// Registration replaces: the most recent definition under a name wins,
/// built-ins included. The registry is fixed at mapper construction and
/// read-only afterwards.
#[derive(Debug, Clone)]
pub struct FinderRegistry {
    finders: HashMap<String, FinderDef>,
}

impl FinderRegistry {
    /// Creates a registry holding the built-in finders.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self {
            finders: HashMap::new(),
        };

        registry.register(
            "all",
            FinderDef::new(ResultShape::Entities, |config, options| {
                options.build(&config.source)
            }),
        );
        registry.register(
            "first",
            FinderDef::new(ResultShape::Single, |config, mut options| {
                options.limit = Some(1);
                options.page = None;
                options.build(&config.source)
            }),
        );
        registry.register(
            "count",
            FinderDef::new(ResultShape::Count, |config, options| {
                options.build(&config.source)
            }),
        );
        registry.register(
            "list",
            FinderDef::new(ResultShape::Listing, |config, mut options| {
                let mut fields = vec![config.primary_key.clone()];
                let display = config.effective_display_field();
                if display != config.primary_key {
                    fields.push(display.to_string());
                }
                options.fields = fields;
                options.build(&config.source)
            }),
        );

        registry
    }

    /// Registers a finder under a name, replacing any existing one.
    pub fn register(&mut self, name: impl Into<String>, def: FinderDef) {
        self.finders.insert(name.into(), def);
    }

    /// Returns `true` if a finder is registered under this name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.finders.contains_key(name)
    }

    /// Resolves a registered finder into a result shape and a frozen
    /// descriptor.
    ///
    /// # Errors
    ///
    /// Fails with [`MapperError::UnknownFinder`] for unregistered
    /// names; option validation failures propagate from the finder's
    /// build function.
    pub fn resolve(
        &self,
        name: &str,
        config: &ModelConfig,
        options: QueryOptions,
    ) -> MapperResult<(ResultShape, QueryDescriptor)> {
        let def = self
            .finders
            .get(name)
            .ok_or_else(|| MapperError::unknown_finder(name))?;
        let descriptor = def.build_descriptor(config, options)?;
        Ok((def.shape(), descriptor))
    }
}

impl Default for FinderRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// A dynamic finder call name, decomposed.
///
/// `findAllByAuthorAndTitle` parses to base `all` with fields
/// `["author", "title"]`; `findByEmail` parses to base `first`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicFinder {
    /// The base finder name, snake_cased.
    pub base: String,
    /// The condition fields, snake_cased, in call-name order.
    pub fields: Vec<String>,
}

/// Parses a `find<Base>By<Field>And<Field>...` call name.
///
/// Returns `None` when the name does not follow the dynamic pattern.
/// Field and base segments are camel-cased in the call name and
/// normalized to snake_case (`AuthorId` becomes `author_id`). An empty
/// base segment (`findByEmail`) means `first`.
#[must_use]
pub fn parse_dynamic(name: &str) -> Option<DynamicFinder> {
    let rest = name.strip_prefix("find")?;
    let split = find_camel_word(rest, "By")?;
    let (base_camel, fields_camel) = (&rest[..split], &rest[split + 2..]);

    if fields_camel.is_empty() {
        return None;
    }

    let base = if base_camel.is_empty() {
        "first".to_string()
    } else {
        camel_to_snake(base_camel)
    };

    let fields = split_camel_words(fields_camel, "And")
        .into_iter()
        .map(camel_to_snake)
        .collect::<Vec<_>>();
    if fields.iter().any(String::is_empty) {
        return None;
    }

    Some(DynamicFinder { base, fields })
}

/// Finds the first occurrence of `word` that sits on a camel boundary:
/// the word itself starts a segment and an uppercase letter follows it.
fn find_camel_word(s: &str, word: &str) -> Option<usize> {
    let mut search_from = 0;
    while let Some(found) = s[search_from..].find(word) {
        let at = search_from + found;
        let next = s[at + word.len()..].chars().next();
        if next.is_some_and(|c| c.is_ascii_uppercase()) {
            return Some(at);
        }
        search_from = at + word.len();
    }
    None
}

/// Splits a camel segment list on `word` boundaries.
fn split_camel_words<'a>(s: &'a str, word: &str) -> Vec<&'a str> {
    let mut segments = Vec::new();
    let mut remaining = s;
    while let Some(at) = find_camel_word(remaining, word) {
        segments.push(&remaining[..at]);
        remaining = &remaining[at + word.len()..];
    }
    segments.push(remaining);
    segments
}

/// Converts a camel-cased segment to snake_case.
fn camel_to_snake(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    for ch in s.chars() {
        if ch.is_ascii_uppercase() && !out.is_empty() {
            out.push('_');
        }
        out.push(ch.to_ascii_lowercase());
    }
    out
}
