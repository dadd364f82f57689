//! Rule-based field validation keyed by event context.

use rowmap_value::{Record, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Validation error map: field name to messages, in rule declaration
/// order per field.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// The lifecycle context a save runs under.
///
/// `save` derives the default event from the entity: [`Event::Create`]
/// for a new entity, [`Event::Update`] for an existing one. Callers can
/// override the context and define their own with [`Event::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Event {
    /// The entity is being persisted for the first time.
    Create,
    /// An existing entity is being rewritten.
    Update,
    /// A caller-defined context.
    Custom(String),
}

/// The event contexts a rule applies to.
#[derive(Debug, Clone)]
pub enum AppliesTo {
    /// The rule runs in every context.
    Always,
    /// The rule runs only when one of these events is active.
    On(Vec<Event>),
}

/// One validation rule: a predicate, a failure message, and the events
/// it applies to.
///
/// Rules default to applying always; scope them with [`Rule::on`].
///
/// # Example
///
/// ```rust
/// use rowmap_core::{Event, Rule};
///
/// let title_rules = [
///     Rule::not_empty("title is required").on([Event::Create]),
///     Rule::max_length(120, "title is too long"),
/// ];
/// # let _ = title_rules;
/// ```
#[derive(Clone)]
pub struct Rule {
    check: Arc<dyn Fn(&Value) -> bool + Send + Sync>,
    message: String,
    applies: AppliesTo,
}

impl Rule {
    /// Creates a rule from a predicate.
    ///
    /// The predicate sees the field's current value, or [`Value::Null`]
    /// when the field is absent, and returns `true` when the value is
    /// acceptable.
    pub fn new(
        message: impl Into<String>,
        check: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            check: Arc::new(check),
            message: message.into(),
            applies: AppliesTo::Always,
        }
    }

    /// Restricts the rule to the given events.
    #[must_use]
    pub fn on(mut self, events: impl IntoIterator<Item = Event>) -> Self {
        self.applies = AppliesTo::On(events.into_iter().collect());
        self
    }

    /// The value must not be empty: null, empty text, empty arrays,
    /// maps, and byte strings all fail. `false` and `0` pass.
    ///
    /// This is the presence check. Every other stock rule accepts a
    /// null (or absent) value, so optional fields validate only when
    /// set; pair them with `not_empty` to require the field.
    pub fn not_empty(message: impl Into<String>) -> Self {
        Self::new(message, |value| !value.is_empty())
    }

    /// The value, when set, must be an integer or a float.
    pub fn numeric(message: impl Into<String>) -> Self {
        Self::new(message, |value| {
            value.is_null() || value.as_number().is_some()
        })
    }

    /// The value, when set, must be a boolean.
    pub fn boolean(message: impl Into<String>) -> Self {
        Self::new(message, |value| value.is_null() || value.as_bool().is_some())
    }

    /// The value, when set, must be text at least `min` characters
    /// long.
    pub fn min_length(min: usize, message: impl Into<String>) -> Self {
        Self::new(message, move |value| {
            value.is_null() || value.as_text().is_some_and(|s| s.chars().count() >= min)
        })
    }

    /// The value, when set, must be text at most `max` characters long.
    pub fn max_length(max: usize, message: impl Into<String>) -> Self {
        Self::new(message, move |value| {
            value.is_null() || value.as_text().is_some_and(|s| s.chars().count() <= max)
        })
    }

    /// The value, when set, must equal one of the allowed values.
    pub fn in_list(
        allowed: impl IntoIterator<Item = impl Into<Value>>,
        message: impl Into<String>,
    ) -> Self {
        let allowed: Vec<Value> = allowed.into_iter().map(Into::into).collect();
        Self::new(message, move |value| {
            value.is_null()
                || allowed
                    .iter()
                    .any(|v| value.compare(v) == std::cmp::Ordering::Equal)
        })
    }

    /// The failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns `true` if this rule runs under any of the active events.
    #[must_use]
    pub fn applies_to(&self, events: &[Event]) -> bool {
        match &self.applies {
            AppliesTo::Always => true,
            AppliesTo::On(scoped) => scoped.iter().any(|e| events.contains(e)),
        }
    }

    /// Evaluates the predicate.
    #[must_use]
    pub fn check(&self, value: &Value) -> bool {
        (self.check)(value)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("message", &self.message)
            .field("applies", &self.applies)
            .finish_non_exhaustive()
    }
}

/// Rule-based field validator.
///
/// Rules are declared per field at construction and evaluated in
/// declaration order. Every applicable rule runs - there is no
/// short-circuit - so one pass surfaces all failures.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    rules: Vec<(String, Vec<Rule>)>,
}

impl Validator {
    /// Creates a validator with no rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a rule for a field in builder style.
    #[must_use]
    pub fn rule(mut self, field: impl Into<String>, rule: Rule) -> Self {
        let field = field.into();
        match self.rules.iter_mut().find(|(f, _)| *f == field) {
            Some((_, rules)) => rules.push(rule),
            None => self.rules.push((field, vec![rule])),
        }
        self
    }

    /// Appends several rules for a field in builder style.
    #[must_use]
    pub fn rules(mut self, field: impl Into<String>, rules: impl IntoIterator<Item = Rule>) -> Self {
        let field = field.into();
        for rule in rules {
            self = self.rule(field.clone(), rule);
        }
        self
    }

    /// Returns `true` if no rules are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Validates a record under the given events.
    ///
    /// Returns per-field failure messages; an empty map means valid.
    /// Fields without rules never appear in the result. Absent fields
    /// evaluate as [`Value::Null`].
    #[must_use]
    pub fn validate(&self, record: &Record, events: &[Event]) -> FieldErrors {
        let mut errors = FieldErrors::new();

        for (field, rules) in &self.rules {
            let value = record.get(field).unwrap_or(&Value::Null);
            for rule in rules {
                if rule.applies_to(events) && !rule.check(value) {
                    errors
                        .entry(field.clone())
                        .or_default()
                        .push(rule.message().to_string());
                }
            }
        }

        errors
    }
}
