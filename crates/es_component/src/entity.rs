//! Entity type and allocation utilities.
//!
//! An [`Entity`] is a lightweight `u32` identifier with no inherent data.
//! Ids are handed out in strictly increasing order and are never reused
//! within the lifetime of one [`EntityAllocator`].

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// A unique entity identifier.
///
/// Entities are pure identifiers. Components are attached to entities by a
/// storage to give them meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity(pub u32);

impl Entity {
    /// Create an entity from a raw `u32` identifier.
    #[must_use]
    pub const fn from_raw(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw `u32` identifier.
    #[must_use]
    pub const fn id(self) -> u32 {
        self.0
    }
}

impl From<u32> for Entity {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// A half-open range `[start, end)` of consecutively allocated entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRange {
    start: u32,
    end: u32,
}

impl EntityRange {
    /// The first entity of the range (also the value of an empty range's end).
    #[must_use]
    pub const fn start(&self) -> Entity {
        Entity(self.start)
    }

    /// One past the last entity of the range.
    #[must_use]
    pub const fn end(&self) -> Entity {
        Entity(self.end)
    }

    /// Number of entities in the range.
    #[must_use]
    pub const fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    /// Returns `true` if the range holds no entities.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns `true` if `entity` lies inside the range.
    #[must_use]
    pub const fn contains(&self, entity: Entity) -> bool {
        entity.0 >= self.start && entity.0 < self.end
    }

    /// Iterate over the entities of the range in ascending order.
    pub fn iter(&self) -> <Self as IntoIterator>::IntoIter {
        (*self).into_iter()
    }
}

impl IntoIterator for EntityRange {
    type Item = Entity;
    type IntoIter = std::iter::Map<Range<u32>, fn(u32) -> Entity>;

    fn into_iter(self) -> Self::IntoIter {
        (self.start..self.end).map(Entity as fn(u32) -> Entity)
    }
}

/// Allocates strictly increasing entity IDs.
///
/// The counter is kept wider than the id space so that exhaustion is
/// detected instead of wrapping back to zero.
#[derive(Debug, Default)]
pub struct EntityAllocator {
    next_id: u64,
}

impl EntityAllocator {
    /// Creates a new allocator. IDs start at 0.
    #[must_use]
    pub fn new() -> Self {
        Self { next_id: 0 }
    }

    /// Allocates a fresh entity ID, or `None` once the 32-bit space is used up.
    pub fn allocate(&mut self) -> Option<Entity> {
        let range = self.allocate_range(1)?;
        Some(range.start())
    }

    /// Allocates `count` consecutive IDs in one step.
    ///
    /// Returns `None` (and allocates nothing) if the range would run past
    /// the end of the id space. The half-open end must stay representable,
    /// so `u32::MAX` itself is only ever reachable through
    /// [`EntityAllocator::reserve`].
    pub fn allocate_range(&mut self, count: u32) -> Option<EntityRange> {
        let start = u32::try_from(self.next_id).ok()?;
        let end = start.checked_add(count)?;
        self.next_id = u64::from(end);
        Some(EntityRange { start, end })
    }

    /// Make sure `id` is never handed out again by advancing the counter past
    /// it. Ids below the current counter leave the allocator unchanged.
    pub fn reserve(&mut self, id: Entity) {
        let past = u64::from(id.0) + 1;
        if self.next_id < past {
            self.next_id = past;
        }
    }

    /// The id that the next call to [`EntityAllocator::allocate`] would return.
    #[must_use]
    pub fn peek(&self) -> Option<Entity> {
        u32::try_from(self.next_id).ok().map(Entity)
    }

    /// Returns the number of ids consumed so far (allocated or reserved).
    #[must_use]
    pub fn count(&self) -> u64 {
        self.next_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_creation() {
        let e = Entity::from_raw(42);
        assert_eq!(e.id(), 42);
        assert_eq!(e.to_string(), "Entity(42)");
    }

    #[test]
    fn test_allocator_produces_increasing_ids() {
        let mut alloc = EntityAllocator::new();
        let e1 = alloc.allocate().unwrap();
        let e2 = alloc.allocate().unwrap();
        let e3 = alloc.allocate().unwrap();
        assert_eq!(e1.id(), 0);
        assert_eq!(e2.id(), 1);
        assert_eq!(e3.id(), 2);
        assert_eq!(alloc.count(), 3);
    }

    #[test]
    fn test_reserve_advances_past_external_id() {
        let mut alloc = EntityAllocator::new();
        alloc.reserve(Entity(10));
        assert_eq!(alloc.allocate(), Some(Entity(11)));

        // Reserving something already behind the counter changes nothing.
        alloc.reserve(Entity(3));
        assert_eq!(alloc.allocate(), Some(Entity(12)));
    }

    #[test]
    fn test_allocate_range_is_contiguous() {
        let mut alloc = EntityAllocator::new();
        alloc.allocate().unwrap();
        let range = alloc.allocate_range(4).unwrap();
        assert_eq!(range.start(), Entity(1));
        assert_eq!(range.end(), Entity(5));
        assert_eq!(range.len(), 4);
        assert!(range.contains(Entity(4)));
        assert!(!range.contains(Entity(5)));
        let ids: Vec<u32> = range.into_iter().map(Entity::id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(alloc.allocate(), Some(Entity(5)));
    }

    #[test]
    fn test_empty_range() {
        let mut alloc = EntityAllocator::new();
        let range = alloc.allocate_range(0).unwrap();
        assert!(range.is_empty());
        assert_eq!(range.iter().count(), 0);
        assert_eq!(alloc.count(), 0);
    }

    #[test]
    fn test_exhaustion_does_not_wrap() {
        let mut alloc = EntityAllocator::new();
        alloc.reserve(Entity(u32::MAX - 2));
        assert_eq!(alloc.allocate(), Some(Entity(u32::MAX - 1)));
        assert!(alloc.allocate_range(2).is_none());
        assert_eq!(alloc.peek(), Some(Entity(u32::MAX)));
    }

    #[test]
    fn test_entity_serialization_roundtrip() {
        let entity = Entity::from_raw(999);
        let bytes = rmp_serde::to_vec(&entity).unwrap();
        let restored: Entity = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(entity, restored);
    }
}
