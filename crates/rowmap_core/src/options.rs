//! Options for the mapper's write operations.

use crate::validator::Event;

/// Options for `save`.
///
/// Defaults: validation on, events derived from the entity's existence,
/// callbacks on, all fields written.
#[derive(Debug, Clone)]
pub struct SaveOptions {
    /// Whether to run the validator before writing.
    pub validate: bool,

    /// Event contexts for validation. `None` derives the context from
    /// the entity: create when new, update when existing.
    pub events: Option<Vec<Event>>,

    /// Whether observer hooks fire around the write.
    pub callbacks: bool,

    /// When set, only these fields are sent to storage for this call;
    /// fields outside the list are silently ignored.
    pub whitelist: Option<Vec<String>>,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            validate: true,
            events: None,
            callbacks: true,
            whitelist: None,
        }
    }
}

impl SaveOptions {
    /// Creates the default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables validation.
    #[must_use]
    pub const fn validate(mut self, value: bool) -> Self {
        self.validate = value;
        self
    }

    /// Overrides the validation event contexts.
    #[must_use]
    pub fn events(mut self, events: impl IntoIterator<Item = Event>) -> Self {
        self.events = Some(events.into_iter().collect());
        self
    }

    /// Enables or disables observer callbacks.
    #[must_use]
    pub const fn callbacks(mut self, value: bool) -> Self {
        self.callbacks = value;
        self
    }

    /// Restricts the written fields for this call.
    #[must_use]
    pub fn whitelist(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.whitelist = Some(fields.into_iter().map(Into::into).collect());
        self
    }
}

/// Options for deleting a single entity.
#[derive(Debug, Clone)]
pub struct DeleteOptions {
    /// Whether observer hooks fire around the delete.
    pub callbacks: bool,
}

impl Default for DeleteOptions {
    fn default() -> Self {
        Self { callbacks: true }
    }
}

impl DeleteOptions {
    /// Creates the default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables observer callbacks.
    #[must_use]
    pub const fn callbacks(mut self, value: bool) -> Self {
        self.callbacks = value;
        self
    }
}

/// Options for the bulk `remove` operation.
#[derive(Debug, Clone, Default)]
pub struct RemoveOptions {
    /// Opt-in for a remove whose conditions match every record.
    ///
    /// An unscoped remove fails closed unless this is set. There is no
    /// quiet way to delete everything.
    pub confirm_unscoped: bool,
}

impl RemoveOptions {
    /// Creates the default options: unscoped removes refused.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allows this call to delete every record when unconstrained.
    #[must_use]
    pub const fn confirm_unscoped(mut self) -> Self {
        self.confirm_unscoped = true;
        self
    }
}
