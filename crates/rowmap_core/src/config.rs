//! Mapper configuration.

/// Configuration for constructing a [`crate::Model`].
///
/// The configuration is read once at construction and never mutated
/// afterwards; a mapper's source, primary key, and display field are
/// fixed for its lifetime.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// The table or collection this mapper reads and writes.
    pub source: String,

    /// The field holding each row's identity.
    pub primary_key: String,

    /// The field shown as the value side of `list` results.
    ///
    /// When unset, `list` falls back to a `title` field and finally to
    /// the primary key.
    pub display_field: Option<String>,
}

impl ModelConfig {
    /// Creates a configuration for a source with default field names.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            primary_key: "id".to_string(),
            display_field: None,
        }
    }

    /// Sets the primary key field.
    #[must_use]
    pub fn primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_key = field.into();
        self
    }

    /// Sets the display field used by `list` results.
    #[must_use]
    pub fn display_field(mut self, field: impl Into<String>) -> Self {
        self.display_field = Some(field.into());
        self
    }

    /// The display field to project for `list`, before row-level
    /// fallback to the primary key.
    #[must_use]
    pub fn effective_display_field(&self) -> &str {
        self.display_field.as_deref().unwrap_or("title")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ModelConfig::new("posts");
        assert_eq!(config.source, "posts");
        assert_eq!(config.primary_key, "id");
        assert_eq!(config.effective_display_field(), "title");
    }

    #[test]
    fn builder_pattern() {
        let config = ModelConfig::new("people")
            .primary_key("person_id")
            .display_field("full_name");

        assert_eq!(config.primary_key, "person_id");
        assert_eq!(config.effective_display_field(), "full_name");
    }
}
