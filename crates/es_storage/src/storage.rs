//! The [`Storage`] root: component registry, entity lifecycle and field access.
//!
//! Batch iteration lives in [`crate::iter`] and the binary record format in
//! [`crate::serialize`]; both extend [`Storage`] with further `impl` blocks.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use bytemuck::Pod;
use es_component::{
    BoxedComponent, ComponentDescriptor, ComponentError, ComponentId, ComponentKind,
    ComponentMask, Entity, EntityAllocator, EntityRange, MAX_COMPONENTS,
};
use tracing::{debug, trace};

use crate::config::StorageConfig;
use crate::error::{Result, StorageError};
use crate::hooks::LifecycleHooks;
use crate::layout::OffsetCache;
use crate::record::EntityRecord;

/// Packed entity/component store.
///
/// Components are registered at runtime and receive positional ids. Each
/// entity owns one [`EntityRecord`] holding its present components back to
/// back in ascending id order.
///
/// ```rust
/// use es_storage::Storage;
///
/// let mut storage = Storage::new();
/// let health = storage.register_flat::<i32>("health").unwrap();
/// let name = storage.register_boxed::<String>("name").unwrap();
///
/// let e = storage.create().unwrap();
/// storage.set(e, health, 20i32).unwrap();
/// storage.set(e, name, String::from("Timmy")).unwrap();
///
/// assert_eq!(*storage.get::<i32>(e, health).unwrap(), 20);
/// assert_eq!(storage.get::<String>(e, name).unwrap(), "Timmy");
/// ```
pub struct Storage {
    pub(crate) descriptors: Vec<ComponentDescriptor>,
    pub(crate) layout: OffsetCache,
    /// Ids of the registered boxed components.
    pub(crate) boxed: ComponentMask,
    pub(crate) entities: HashMap<Entity, EntityRecord>,
    pub(crate) allocator: EntityAllocator,
    pub(crate) hooks: LifecycleHooks,
}

impl Storage {
    /// Create an empty storage with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::build(&StorageConfig::default())
    }

    /// Create an empty storage with a custom configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidConfig`] if a value is out of range.
    pub fn with_config(config: StorageConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(&config))
    }

    fn build(config: &StorageConfig) -> Self {
        debug!(
            offset_cache_window = config.offset_cache_window,
            entity_capacity = config.entity_capacity,
            "created storage"
        );
        Self {
            descriptors: Vec::new(),
            layout: OffsetCache::new(config.offset_cache_window),
            boxed: ComponentMask::EMPTY,
            entities: HashMap::with_capacity(config.entity_capacity),
            allocator: EntityAllocator::new(),
            hooks: LifecycleHooks::default(),
        }
    }

    // -- Registry ---------------------------------------------------------

    /// Register a component type and return its id.
    ///
    /// # Errors
    ///
    /// - [`StorageError::CapacityExceeded`] if 64 components already exist.
    /// - [`StorageError::DuplicateName`] if the name is taken.
    /// - [`StorageError::ComponentTooLarge`] if records could outgrow the
    ///   `u32` offset table.
    pub fn register(&mut self, descriptor: ComponentDescriptor) -> Result<ComponentId> {
        let index = self.descriptors.len();
        let id = u8::try_from(index)
            .ok()
            .and_then(ComponentId::new)
            .ok_or(StorageError::CapacityExceeded {
                limit: MAX_COMPONENTS,
            })?;

        if self.descriptors.iter().any(|d| d.name() == descriptor.name()) {
            return Err(StorageError::DuplicateName(descriptor.name().to_owned()));
        }

        let largest = (self.layout.record_len(ComponentMask::first(index).bits()) as u64)
            .checked_add(descriptor.stride() as u64);
        let stride = u32::try_from(descriptor.stride())
            .ok()
            .filter(|_| largest.is_some_and(|len| len <= u64::from(u32::MAX)))
            .ok_or_else(|| StorageError::ComponentTooLarge {
                component: descriptor.name().to_owned(),
                size: descriptor.size(),
            })?;

        debug!(
            component = descriptor.name(),
            id = id.get(),
            size = descriptor.size(),
            stride,
            kind = ?descriptor.kind(),
            "registered component"
        );

        self.layout.push(stride);
        if descriptor.kind() == ComponentKind::Boxed {
            self.boxed.insert(id);
        }
        self.descriptors.push(descriptor);
        Ok(id)
    }

    /// Register a flat component stored as the plain bytes of `T`.
    ///
    /// # Errors
    ///
    /// Fails like [`Storage::register`], or with an alignment error if `T`
    /// needs more than 8-byte alignment.
    pub fn register_flat<T: Pod>(&mut self, name: impl Into<String>) -> Result<ComponentId> {
        let descriptor = ComponentDescriptor::flat::<T>(name)?;
        self.register(descriptor)
    }

    /// Register a boxed component using `T`'s [`BoxedComponent`] hooks.
    ///
    /// # Errors
    ///
    /// Fails like [`Storage::register`].
    pub fn register_boxed<T: BoxedComponent>(
        &mut self,
        name: impl Into<String>,
    ) -> Result<ComponentId> {
        self.register(ComponentDescriptor::boxed::<T>(name))
    }

    /// Look up a component id by name.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if no component has that name.
    pub fn find(&self, name: &str) -> Result<ComponentId> {
        self.descriptors
            .iter()
            .position(|d| d.name() == name)
            .and_then(|index| ComponentId::new(index as u8))
            .ok_or_else(|| StorageError::NotFound(name.to_owned()))
    }

    /// Descriptor of a registered component.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::UnknownComponent`] if `id` is not registered.
    pub fn descriptor(&self, id: ComponentId) -> Result<&ComponentDescriptor> {
        self.descriptors
            .get(id.index())
            .ok_or(StorageError::UnknownComponent(id))
    }

    /// Every registered descriptor, indexed by id.
    #[must_use]
    pub fn components(&self) -> &[ComponentDescriptor] {
        &self.descriptors
    }

    /// Number of registered components.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.descriptors.len()
    }

    /// Descriptor of `id`, checked to hold values of `T`.
    pub(crate) fn typed_descriptor<T: Any>(&self, id: ComponentId) -> Result<&ComponentDescriptor> {
        let descriptor = self.descriptor(id)?;
        if descriptor.accepts::<T>() {
            Ok(descriptor)
        } else {
            Err(StorageError::TypeMismatch {
                component: id,
                expected: descriptor.type_name(),
                actual: std::any::type_name::<T>(),
            })
        }
    }

    // -- Entity lifecycle -------------------------------------------------

    /// Create an entity with no components.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::IdsExhausted`] once every `u32` id is used.
    pub fn create(&mut self) -> Result<Entity> {
        let entity = self.allocator.allocate().ok_or(StorageError::IdsExhausted)?;
        self.insert_record(entity, EntityRecord::new());
        trace!(entity = %entity, "created entity");
        Ok(entity)
    }

    /// Create the entity with a known id, or return it unchanged if it
    /// already exists.
    ///
    /// The allocator is advanced past `id`.
    pub fn create_with_id(&mut self, id: u32) -> Entity {
        let entity = Entity::from_raw(id);
        if !self.entities.contains_key(&entity) {
            self.allocator.reserve(entity);
            self.insert_record(entity, EntityRecord::new());
            trace!(entity = %entity, "created entity at known id");
        }
        entity
    }

    /// Create `count` entities with contiguous ids.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::IdsExhausted`] if the range would not fit
    /// the id space; no entity is created then.
    pub fn create_batch(&mut self, count: u32) -> Result<EntityRange> {
        let range = self
            .allocator
            .allocate_range(count)
            .ok_or(StorageError::IdsExhausted)?;
        self.entities.reserve(range.len());
        for entity in range {
            self.insert_record(entity, EntityRecord::new());
        }
        trace!(start = %range.start(), end = %range.end(), "created entity batch");
        Ok(range)
    }

    /// Create a new entity holding a deep copy of `source`'s components.
    ///
    /// Boxed payloads are duplicated through their clone operation, so the
    /// copy shares no state with the original.
    ///
    /// # Errors
    ///
    /// - [`StorageError::UnknownEntity`] if `source` does not exist.
    /// - [`StorageError::IdsExhausted`] when no id is left.
    pub fn clone_entity(&mut self, source: Entity) -> Result<Entity> {
        let original = self.record(source)?;
        let mut copy = EntityRecord::zeroed(original.components(), original.byte_len());
        copy.bytes_mut().copy_from_slice(original.bytes());

        for id in original.components() & self.boxed {
            let offset = self.layout.offset(original.components().bits(), id.index());
            let payload = original
                .payloads()
                .get(original.read_handle(offset))
                .ok_or(ComponentError::PayloadMismatch {
                    expected: self.descriptors[id.index()].type_name(),
                })?;
            let Some(ops) = self.descriptors[id.index()].ops() else {
                return Err(StorageError::UnknownComponent(id));
            };
            let duplicate = (ops.clone_fn)(payload)?;
            let handle = copy.payloads_mut().insert(duplicate);
            copy.write_handle(offset, handle);
        }

        let entity = self.allocator.allocate().ok_or(StorageError::IdsExhausted)?;
        self.insert_record(entity, copy);
        trace!(source = %source, entity = %entity, "cloned entity");
        Ok(entity)
    }

    /// Delete an entity, dropping its boxed payloads.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::UnknownEntity`] if `entity` does not exist.
    pub fn delete(&mut self, entity: Entity) -> Result<()> {
        if self.remove_record(entity) {
            Ok(())
        } else {
            Err(StorageError::UnknownEntity(entity))
        }
    }

    /// Delete the entity with raw id `id`, if present.
    ///
    /// Returns whether an entity was removed.
    pub fn delete_id(&mut self, id: u32) -> bool {
        self.remove_record(Entity::from_raw(id))
    }

    /// Returns `true` if the entity exists.
    #[must_use]
    pub fn exists(&self, entity: Entity) -> bool {
        self.entities.contains_key(&entity)
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if there are no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterate over every entity and its record, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &EntityRecord)> {
        self.entities.iter().map(|(&entity, record)| (entity, record))
    }

    /// The record of an entity.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::UnknownEntity`] if `entity` does not exist.
    pub fn record(&self, entity: Entity) -> Result<&EntityRecord> {
        self.entities
            .get(&entity)
            .ok_or(StorageError::UnknownEntity(entity))
    }

    /// Install the callback run after every entity creation.
    ///
    /// Replaces any previous creation hook.
    pub fn on_entity_created(&mut self, hook: impl FnMut(Entity, &EntityRecord) + 'static) {
        self.hooks.created = Some(Box::new(hook));
    }

    /// Install the callback run before every entity deletion.
    ///
    /// Replaces any previous deletion hook.
    pub fn on_entity_deleted(&mut self, hook: impl FnMut(Entity, &EntityRecord) + 'static) {
        self.hooks.deleted = Some(Box::new(hook));
    }

    /// Insert a fully built record and run the creation hook.
    pub(crate) fn insert_record(&mut self, entity: Entity, record: EntityRecord) {
        self.entities.insert(entity, record);
        if let Some(record) = self.entities.get(&entity) {
            self.hooks.entity_created(entity, record);
        }
    }

    /// Remove a record after running the deletion hook.
    pub(crate) fn remove_record(&mut self, entity: Entity) -> bool {
        let Some(record) = self.entities.get(&entity) else {
            return false;
        };
        self.hooks.entity_deleted(entity, record);

        if let Some(mut record) = self.entities.remove(&entity) {
            self.release(&mut record);
        }
        trace!(entity = %entity, "deleted entity");
        true
    }

    /// Drop every boxed payload of `record` in ascending offset order.
    pub(crate) fn release(&self, record: &mut EntityRecord) {
        let mask = record.components();
        let holders: Vec<usize> = (mask & self.boxed)
            .iter()
            .map(|id| self.layout.offset(mask.bits(), id.index()))
            .collect();
        record.release_payloads(holders);
    }

    // -- Field access -----------------------------------------------------

    /// Store `value` as component `id` of `entity`.
    ///
    /// Inserts a slot if the component is absent, otherwise replaces the
    /// value in place. The component is marked dirty.
    ///
    /// # Errors
    ///
    /// - [`StorageError::UnknownComponent`] or [`StorageError::TypeMismatch`]
    ///   if `id` does not hold values of `T`.
    /// - [`StorageError::UnknownEntity`] if `entity` does not exist.
    pub fn set<T: Any>(&mut self, entity: Entity, id: ComponentId, value: T) -> Result<()> {
        let descriptor = self.typed_descriptor::<T>(id)?;
        let (kind, stride) = (descriptor.kind(), descriptor.stride());
        let record = self
            .entities
            .get_mut(&entity)
            .ok_or(StorageError::UnknownEntity(entity))?;
        let mask = record.components();
        let offset = self.layout.offset(mask.bits(), id.index());

        match kind {
            ComponentKind::Flat => {
                if !mask.contains(id) {
                    record.insert_slot(offset, stride);
                    record.set_components(mask | ComponentMask::single(id));
                }
                let slot = &mut record.bytes_mut()[offset..offset + std::mem::size_of::<T>()];
                // SAFETY: a flat descriptor carrying a type id is only built
                // from a `Pod` type, and it accepts `T`, so `T` is that type.
                // The slot spans `size_of::<T>()` bytes at an 8-aligned
                // offset of a word-aligned buffer.
                unsafe { slot.as_mut_ptr().cast::<T>().write(value) };
            }
            ComponentKind::Boxed => {
                if mask.contains(id) {
                    let handle = record.read_handle(offset);
                    drop(record.payloads_mut().replace(handle, Box::new(value)));
                } else {
                    let handle = record.payloads_mut().insert(Box::new(value));
                    record.insert_slot(offset, stride);
                    record.write_handle(offset, handle);
                    record.set_components(mask | ComponentMask::single(id));
                }
            }
        }
        record.mark_dirty(id);
        Ok(())
    }

    /// Borrow component `id` of `entity`.
    ///
    /// # Errors
    ///
    /// - [`StorageError::UnknownComponent`] or [`StorageError::TypeMismatch`]
    ///   if `id` does not hold values of `T`.
    /// - [`StorageError::UnknownEntity`] if `entity` does not exist.
    /// - [`StorageError::ComponentMissing`] if the component is absent.
    pub fn get<T: Any>(&self, entity: Entity, id: ComponentId) -> Result<&T> {
        let descriptor = self.typed_descriptor::<T>(id)?;
        let record = self.record(entity)?;
        let offset = self.present_offset(entity, record, id)?;

        match descriptor.kind() {
            ComponentKind::Flat => {
                let slot = &record.bytes()[offset..offset + std::mem::size_of::<T>()];
                // SAFETY: see `set`; the slot holds a valid `T` written by
                // `set`, `set_bytes` or deserialization of a `Pod` value.
                Ok(unsafe { &*slot.as_ptr().cast::<T>() })
            }
            ComponentKind::Boxed => record
                .payloads()
                .get(record.read_handle(offset))
                .and_then(|payload| payload.downcast_ref::<T>())
                .ok_or_else(payload_mismatch::<T>),
        }
    }

    /// Mutably borrow component `id` of `entity`.
    ///
    /// Dirty bits are left alone; call [`Storage::mark_dirty`] to report
    /// the change.
    ///
    /// # Errors
    ///
    /// Same as [`Storage::get`].
    pub fn get_mut<T: Any>(&mut self, entity: Entity, id: ComponentId) -> Result<&mut T> {
        let kind = self.typed_descriptor::<T>(id)?.kind();
        let offset = self.present_offset(entity, self.record(entity)?, id)?;
        let record = self
            .entities
            .get_mut(&entity)
            .ok_or(StorageError::UnknownEntity(entity))?;

        match kind {
            ComponentKind::Flat => {
                let slot = &mut record.bytes_mut()[offset..offset + std::mem::size_of::<T>()];
                // SAFETY: see `get`.
                Ok(unsafe { &mut *slot.as_mut_ptr().cast::<T>() })
            }
            ComponentKind::Boxed => {
                let handle = record.read_handle(offset);
                record
                    .payloads_mut()
                    .get_mut(handle)
                    .and_then(|payload| payload.downcast_mut::<T>())
                    .ok_or_else(payload_mismatch::<T>)
            }
        }
    }

    /// Remove component `id` from `entity`.
    ///
    /// Returns `false` if it was not present. Removal marks the component
    /// dirty.
    ///
    /// # Errors
    ///
    /// - [`StorageError::UnknownComponent`] if `id` is not registered.
    /// - [`StorageError::UnknownEntity`] if `entity` does not exist.
    pub fn remove(&mut self, entity: Entity, id: ComponentId) -> Result<bool> {
        let descriptor = self.descriptor(id)?;
        let (kind, stride) = (descriptor.kind(), descriptor.stride());
        let record = self
            .entities
            .get_mut(&entity)
            .ok_or(StorageError::UnknownEntity(entity))?;
        let mut mask = record.components();
        if !mask.contains(id) {
            return Ok(false);
        }

        let offset = self.layout.offset(mask.bits(), id.index());
        if kind == ComponentKind::Boxed {
            let handle = record.read_handle(offset);
            drop(record.payloads_mut().take(handle));
        }
        record.erase_slot(offset, stride);
        mask.remove(id);
        record.set_components(mask);
        record.mark_dirty(id);
        Ok(true)
    }

    /// Returns `true` if `entity` exists and holds component `id`.
    #[must_use]
    pub fn has(&self, entity: Entity, id: ComponentId) -> bool {
        self.entities
            .get(&entity)
            .is_some_and(|record| record.has(id))
    }

    /// Store the raw bytes of flat component `id`.
    ///
    /// `bytes` must be exactly the component's size. Marks it dirty.
    ///
    /// # Errors
    ///
    /// - [`StorageError::NotFlat`] for boxed components.
    /// - [`StorageError::TruncatedData`] or [`StorageError::TrailingData`]
    ///   if `bytes` is shorter or longer than the component.
    /// - [`StorageError::UnknownEntity`] if `entity` does not exist.
    pub fn set_bytes(&mut self, entity: Entity, id: ComponentId, bytes: &[u8]) -> Result<()> {
        let descriptor = self.flat_descriptor(id)?;
        let (size, stride) = (descriptor.size(), descriptor.stride());
        if bytes.len() < size {
            return Err(StorageError::TruncatedData {
                needed: size,
                remaining: bytes.len(),
            });
        }
        if bytes.len() > size {
            return Err(StorageError::TrailingData {
                remaining: bytes.len() - size,
            });
        }

        let record = self
            .entities
            .get_mut(&entity)
            .ok_or(StorageError::UnknownEntity(entity))?;
        let mask = record.components();
        let offset = self.layout.offset(mask.bits(), id.index());
        if !mask.contains(id) {
            record.insert_slot(offset, stride);
            record.set_components(mask | ComponentMask::single(id));
        }
        record.bytes_mut()[offset..offset + size].copy_from_slice(bytes);
        record.mark_dirty(id);
        Ok(())
    }

    /// The raw bytes of flat component `id`.
    ///
    /// # Errors
    ///
    /// - [`StorageError::NotFlat`] for boxed components.
    /// - [`StorageError::UnknownEntity`] if `entity` does not exist.
    /// - [`StorageError::ComponentMissing`] if the component is absent.
    pub fn get_bytes(&self, entity: Entity, id: ComponentId) -> Result<&[u8]> {
        let size = self.flat_descriptor(id)?.size();
        let record = self.record(entity)?;
        let offset = self.present_offset(entity, record, id)?;
        Ok(&record.bytes()[offset..offset + size])
    }

    fn flat_descriptor(&self, id: ComponentId) -> Result<&ComponentDescriptor> {
        let descriptor = self.descriptor(id)?;
        if descriptor.is_flat() {
            Ok(descriptor)
        } else {
            Err(StorageError::NotFlat { component: id })
        }
    }

    /// Offset of a component that must be present in `record`.
    fn present_offset(&self, entity: Entity, record: &EntityRecord, id: ComponentId) -> Result<usize> {
        let mask = record.components();
        if !mask.contains(id) {
            return Err(StorageError::ComponentMissing {
                entity,
                component: id,
            });
        }
        Ok(self.layout.offset(mask.bits(), id.index()))
    }

    /// Byte offset of component `id` inside `entity`'s buffer.
    ///
    /// # Errors
    ///
    /// - [`StorageError::UnknownComponent`] if `id` is not registered.
    /// - [`StorageError::UnknownEntity`] if `entity` does not exist.
    /// - [`StorageError::ComponentMissing`] if the component is absent.
    pub fn offset_of(&self, entity: Entity, id: ComponentId) -> Result<usize> {
        self.descriptor(id)?;
        let record = self.record(entity)?;
        self.present_offset(entity, record, id)
    }

    // -- Change tracking --------------------------------------------------

    /// Returns `true` if any component of `entity` is dirty.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::UnknownEntity`] if `entity` does not exist.
    pub fn is_dirty(&self, entity: Entity) -> Result<bool> {
        Ok(!self.record(entity)?.dirty().is_empty())
    }

    /// Returns `true` if component `id` of `entity` is dirty.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::UnknownEntity`] if `entity` does not exist.
    pub fn is_component_dirty(&self, entity: Entity, id: ComponentId) -> Result<bool> {
        Ok(self.record(entity)?.dirty().contains(id))
    }

    /// The full dirty set of `entity`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::UnknownEntity`] if `entity` does not exist.
    pub fn dirty_mask(&self, entity: Entity) -> Result<ComponentMask> {
        Ok(self.record(entity)?.dirty())
    }

    /// Clear every dirty bit, returning whether any was set.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::UnknownEntity`] if `entity` does not exist.
    pub fn clear_dirty(&mut self, entity: Entity) -> Result<bool> {
        let record = self.record_mut(entity)?;
        let was = !record.dirty().is_empty();
        record.set_dirty(ComponentMask::EMPTY);
        Ok(was)
    }

    /// Clear the dirty bit of one component, returning its prior value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::UnknownEntity`] if `entity` does not exist.
    pub fn clear_component_dirty(&mut self, entity: Entity, id: ComponentId) -> Result<bool> {
        let record = self.record_mut(entity)?;
        let mut dirty = record.dirty();
        let was = dirty.contains(id);
        dirty.remove(id);
        record.set_dirty(dirty);
        Ok(was)
    }

    /// Mark component `id` of `entity` dirty.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::UnknownEntity`] if `entity` does not exist.
    pub fn mark_dirty(&mut self, entity: Entity, id: ComponentId) -> Result<()> {
        self.record_mut(entity)?.mark_dirty(id);
        Ok(())
    }

    fn record_mut(&mut self, entity: Entity) -> Result<&mut EntityRecord> {
        self.entities
            .get_mut(&entity)
            .ok_or(StorageError::UnknownEntity(entity))
    }
}

fn payload_mismatch<T: Any>() -> StorageError {
    StorageError::Component(ComponentError::PayloadMismatch {
        expected: std::any::type_name::<T>(),
    })
}

impl Default for Storage {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Storage {
    fn drop(&mut self) {
        let mut entities = std::mem::take(&mut self.entities);
        for record in entities.values_mut() {
            self.release(record);
        }
    }
}

impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage")
            .field(
                "components",
                &self.descriptors.iter().map(ComponentDescriptor::name).collect::<Vec<_>>(),
            )
            .field("entities", &self.entities.len())
            .field("next_id", &self.allocator.peek())
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}
