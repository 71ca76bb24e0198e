//! Entity lifecycle callbacks.

use std::fmt;

use es_component::Entity;

use crate::record::EntityRecord;

/// Callback run when an entity is created or deleted.
///
/// Creation hooks see the fully built record; deletion hooks see it right
/// before it is erased.
pub type EntityHook = Box<dyn FnMut(Entity, &EntityRecord)>;

#[derive(Default)]
pub(crate) struct LifecycleHooks {
    pub(crate) created: Option<EntityHook>,
    pub(crate) deleted: Option<EntityHook>,
}

impl LifecycleHooks {
    pub(crate) fn entity_created(&mut self, entity: Entity, record: &EntityRecord) {
        if let Some(hook) = self.created.as_mut() {
            hook(entity, record);
        }
    }

    pub(crate) fn entity_deleted(&mut self, entity: Entity, record: &EntityRecord) {
        if let Some(hook) = self.deleted.as_mut() {
            hook(entity, record);
        }
    }
}

impl fmt::Debug for LifecycleHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleHooks")
            .field("created", &self.created.is_some())
            .field("deleted", &self.deleted.is_some())
            .finish()
    }
}
