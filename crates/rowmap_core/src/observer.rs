//! Lifecycle observers for save and delete.

use crate::entity::Entity;
use crate::error::MapperResult;

/// Observer of entity lifecycle events.
///
/// Observers are registered as an ordered list at mapper construction
/// and fire in registration order around `save` and `delete`. All hooks
/// default to no-ops; implement only what you need.
///
/// A `before_*` hook returning `Ok(false)` aborts the operation: the
/// mapper returns `false` without touching storage. Returning an error
/// propagates it. Hooks are skipped entirely when a call disables
/// callbacks.
///
/// # Example
///
/// ```rust,ignore
/// struct Slugger;
///
/// impl ModelObserver for Slugger {
///     fn before_save(&self, entity: &mut Entity) -> MapperResult<bool> {
///         if let Some(title) = entity.get("title").and_then(|v| v.as_text()) {
///             let slug = title.to_lowercase().replace(' ', "-");
///             entity.set("slug", slug);
///         }
///         Ok(true)
///     }
/// }
/// ```
pub trait ModelObserver: Send + Sync {
    /// Fires before a save is dispatched to storage. Validation has
    /// already passed. Return `Ok(false)` to abort the save.
    fn before_save(&self, _entity: &mut Entity) -> MapperResult<bool> {
        Ok(true)
    }

    /// Fires after a successful save. `created` is `true` for inserts.
    fn after_save(&self, _entity: &Entity, _created: bool) {}

    /// Fires before a delete is dispatched to storage. Return
    /// `Ok(false)` to abort the delete.
    fn before_delete(&self, _entity: &Entity) -> MapperResult<bool> {
        Ok(true)
    }

    /// Fires after a successful delete.
    fn after_delete(&self, _entity: &Entity) {}
}
