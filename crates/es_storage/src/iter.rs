//! Batch iteration over every entity holding a set of components.
//!
//! `for_each`, `for_each2` and `for_each3` visit each entity whose presence
//! mask covers the requested components and hand the callback mutable
//! references into its record. The callback reports which of those
//! components it changed by returning a [`Changed`] (a `bool` converts to
//! "all" or "none"), and may request deletion through [`Visit::delete`].
//!
//! Every matching entity and each of its requested slots is resolved and
//! type-checked before the first callback. A traversal that fails does so
//! without visiting, marking or deleting anything, and deleting the current
//! entity never disturbs the traversal.

use std::any::Any;
use std::ops::BitOr;

use es_component::{ComponentError, ComponentId, ComponentKind, ComponentMask, Entity, TypeInfo};

use crate::error::{Result, StorageError};
use crate::storage::Storage;

/// Which of the requested components a callback modified.
///
/// Bit `i` is the `i`-th component of the query, in argument order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Changed(u8);

impl Changed {
    /// Nothing changed.
    pub const NONE: Self = Self(0);

    /// Every requested component changed.
    pub const ALL: Self = Self(u8::MAX);

    /// Only the component at argument position `position` changed.
    #[must_use]
    pub const fn arg(position: u8) -> Self {
        Self(1 << position)
    }

    /// The raw positional bits.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns `true` if argument `position` is marked.
    #[must_use]
    pub const fn contains(self, position: usize) -> bool {
        position < 8 && self.0 & (1 << position) != 0
    }
}

impl From<bool> for Changed {
    fn from(changed: bool) -> Self {
        if changed { Self::ALL } else { Self::NONE }
    }
}

impl From<()> for Changed {
    fn from((): ()) -> Self {
        Self::NONE
    }
}

impl From<u8> for Changed {
    fn from(bits: u8) -> Self {
        Self(bits)
    }
}

impl BitOr for Changed {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Per-entity context handed to an iteration callback.
#[derive(Debug)]
pub struct Visit {
    entity: Entity,
    delete: bool,
}

impl Visit {
    /// The entity being visited.
    #[must_use]
    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Delete the entity once the callback returns.
    pub fn delete(&mut self) {
        self.delete = true;
    }

    /// Returns `true` if deletion was requested.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.delete
    }
}

impl Storage {
    /// Visit every entity holding component `a`.
    ///
    /// Returns the number of entities visited.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::UnknownComponent`] or
    /// [`StorageError::TypeMismatch`] before visiting anything if `a` does
    /// not hold values of `A`.
    pub fn for_each<A, R, F>(&mut self, a: ComponentId, mut f: F) -> Result<usize>
    where
        A: Any,
        R: Into<Changed>,
        F: FnMut(&mut Visit, &mut A) -> R,
    {
        self.drive([(a, TypeInfo::of::<A>())], |visit, [pa]| {
            // SAFETY: `drive` checked the slot holds an `A` and that it is
            // the only live reference into that slot.
            let a = unsafe { &mut *pa.cast::<A>() };
            f(visit, a).into()
        })
    }

    /// Visit every entity holding both `a` and `b`.
    ///
    /// # Errors
    ///
    /// As [`Storage::for_each`], plus [`StorageError::AliasedQuery`] if the
    /// two ids are equal.
    pub fn for_each2<A, B, R, F>(
        &mut self,
        a: ComponentId,
        b: ComponentId,
        mut f: F,
    ) -> Result<usize>
    where
        A: Any,
        B: Any,
        R: Into<Changed>,
        F: FnMut(&mut Visit, &mut A, &mut B) -> R,
    {
        self.drive(
            [(a, TypeInfo::of::<A>()), (b, TypeInfo::of::<B>())],
            |visit, [pa, pb]| {
                // SAFETY: distinct components occupy disjoint slots or
                // distinct payloads; `drive` checked both types.
                let (a, b) = unsafe { (&mut *pa.cast::<A>(), &mut *pb.cast::<B>()) };
                f(visit, a, b).into()
            },
        )
    }

    /// Visit every entity holding `a`, `b` and `c`.
    ///
    /// # Errors
    ///
    /// As [`Storage::for_each2`].
    pub fn for_each3<A, B, C, R, F>(
        &mut self,
        a: ComponentId,
        b: ComponentId,
        c: ComponentId,
        mut f: F,
    ) -> Result<usize>
    where
        A: Any,
        B: Any,
        C: Any,
        R: Into<Changed>,
        F: FnMut(&mut Visit, &mut A, &mut B, &mut C) -> R,
    {
        self.drive(
            [
                (a, TypeInfo::of::<A>()),
                (b, TypeInfo::of::<B>()),
                (c, TypeInfo::of::<C>()),
            ],
            |visit, [pa, pb, pc]| {
                // SAFETY: as in `for_each2`.
                let (a, b, c) = unsafe {
                    (
                        &mut *pa.cast::<A>(),
                        &mut *pb.cast::<B>(),
                        &mut *pc.cast::<C>(),
                    )
                };
                f(visit, a, b, c).into()
            },
        )
    }

    /// Shared traversal: validates the query, resolves and type-checks
    /// every requested slot of every matching entity, then calls `call`
    /// with one pointer per slot.
    ///
    /// Nothing is visited unless every slot resolves.
    fn drive<const N: usize>(
        &mut self,
        query: [(ComponentId, TypeInfo); N],
        mut call: impl FnMut(&mut Visit, [*mut u8; N]) -> Changed,
    ) -> Result<usize> {
        let mut wanted = ComponentMask::EMPTY;
        for &(id, requested) in &query {
            let descriptor = self.descriptor(id)?;
            if descriptor.type_info().map(|info| info.id) != Some(requested.id) {
                return Err(StorageError::TypeMismatch {
                    component: id,
                    expected: descriptor.type_name(),
                    actual: requested.name,
                });
            }
            if wanted.contains(id) {
                return Err(StorageError::AliasedQuery(id));
            }
            wanted.insert(id);
        }
        let kinds = query.map(|(id, _)| self.descriptors[id.index()].kind());

        let mut resolved: Vec<(Entity, [*mut u8; N])> = Vec::new();
        for (&entity, record) in &mut self.entities {
            if !record.components().contains_all(wanted) {
                continue;
            }
            let mask = record.components().bits();
            let offsets = query.map(|(id, _)| self.layout.offset(mask, id.index()));
            let mut handles = [0u32; N];
            for i in 0..N {
                if kinds[i] == ComponentKind::Boxed {
                    handles[i] = record.read_handle(offsets[i]);
                }
            }

            let (base, payloads) = record.split_mut();
            let mut slots = [std::ptr::null_mut::<u8>(); N];
            for i in 0..N {
                slots[i] = match kinds[i] {
                    // SAFETY: the offset lies inside the record buffer.
                    ComponentKind::Flat => unsafe { base.add(offsets[i]) },
                    ComponentKind::Boxed => {
                        let mismatch = || ComponentError::PayloadMismatch {
                            expected: query[i].1.name,
                        };
                        let payload = payloads.get_mut(handles[i]).ok_or_else(mismatch)?;
                        if (*payload).type_id() != query[i].1.id {
                            return Err(mismatch().into());
                        }
                        std::ptr::from_mut(payload).cast::<u8>()
                    }
                };
            }
            resolved.push((entity, slots));
        }

        let mut visited = 0;
        for (entity, slots) in resolved {
            let mut visit = Visit {
                entity,
                delete: false,
            };
            // Slot pointers target the record's heap buffer and boxed
            // payloads, which stay put while other records are removed.
            let changed = call(&mut visit, slots);

            if let Some(record) = self.entities.get_mut(&entity) {
                for (position, &(id, _)) in query.iter().enumerate() {
                    if changed.contains(position) {
                        record.mark_dirty(id);
                    }
                }
            }
            visited += 1;

            if visit.delete {
                self.remove_record(entity);
            }
        }
        Ok(visited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
    #[repr(C)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
    #[repr(C)]
    struct Velocity {
        x: f32,
        y: f32,
    }

    struct World {
        storage: Storage,
        position: ComponentId,
        velocity: ComponentId,
        name: ComponentId,
    }

    fn world(count: u32) -> World {
        let mut storage = Storage::new();
        let position = storage.register_flat::<Position>("position").unwrap();
        let velocity = storage.register_flat::<Velocity>("velocity").unwrap();
        let name = storage.register_boxed::<String>("name").unwrap();

        for i in 0..count {
            let e = storage.create().unwrap();
            storage
                .set(e, position, Position { x: i as f32, y: 0.0 })
                .unwrap();
            if i % 2 == 0 {
                storage.set(e, velocity, Velocity { x: 1.0, y: 2.0 }).unwrap();
            }
            storage.set(e, name, format!("e{i}")).unwrap();
            storage.clear_dirty(e).unwrap();
        }
        World {
            storage,
            position,
            velocity,
            name,
        }
    }

    #[test]
    fn test_for_each_visits_only_matching_entities() {
        let mut w = world(6);
        let visited = w
            .storage
            .for_each2(w.position, w.velocity, |_, p: &mut Position, v: &mut Velocity| {
                p.x += v.x;
                p.y += v.y;
                Changed::arg(0)
            })
            .unwrap();
        assert_eq!(visited, 3);

        for i in 0..6u32 {
            let e = Entity::from_raw(i);
            let p = *w.storage.get::<Position>(e, w.position).unwrap();
            if i % 2 == 0 {
                assert_eq!(p, Position { x: i as f32 + 1.0, y: 2.0 });
                assert!(w.storage.is_component_dirty(e, w.position).unwrap());
                assert!(!w.storage.is_component_dirty(e, w.velocity).unwrap());
            } else {
                assert_eq!(p, Position { x: i as f32, y: 0.0 });
                assert!(!w.storage.is_dirty(e).unwrap());
            }
        }
    }

    #[test]
    fn test_bool_return_marks_all_requested() {
        let mut w = world(2);
        w.storage
            .for_each2(w.position, w.velocity, |_, _: &mut Position, _: &mut Velocity| true)
            .unwrap();
        let e = Entity::from_raw(0);
        assert!(w.storage.is_component_dirty(e, w.position).unwrap());
        assert!(w.storage.is_component_dirty(e, w.velocity).unwrap());
        assert!(!w.storage.is_component_dirty(e, w.name).unwrap());
    }

    #[test]
    fn test_unit_return_marks_nothing() {
        let mut w = world(3);
        let visited = w
            .storage
            .for_each(w.position, |_, p: &mut Position| {
                p.y = 5.0;
            })
            .unwrap();
        assert_eq!(visited, 3);
        assert!(!w.storage.is_dirty(Entity::from_raw(1)).unwrap());
    }

    #[test]
    fn test_boxed_arguments() {
        let mut w = world(4);
        w.storage
            .for_each3(
                w.name,
                w.position,
                w.velocity,
                |_, name: &mut String, p: &mut Position, _: &mut Velocity| {
                    name.push_str(&format!("@{}", p.x));
                    Changed::arg(0)
                },
            )
            .unwrap();
        let e = Entity::from_raw(2);
        assert_eq!(w.storage.get::<String>(e, w.name).unwrap(), "e2@2");
        assert_eq!(
            w.storage.get::<String>(Entity::from_raw(1), w.name).unwrap(),
            "e1"
        );
    }

    #[test]
    fn test_delete_during_iteration() {
        let mut w = world(6);
        let visited = w
            .storage
            .for_each(w.position, |visit, p: &mut Position| {
                if p.x >= 3.0 {
                    visit.delete();
                }
                false
            })
            .unwrap();
        assert_eq!(visited, 6);
        assert_eq!(w.storage.len(), 3);
        assert!(w.storage.exists(Entity::from_raw(2)));
        assert!(!w.storage.exists(Entity::from_raw(3)));
    }

    #[test]
    fn test_visit_reports_entity() {
        let mut w = world(3);
        let mut seen = Vec::new();
        w.storage
            .for_each(w.name, |visit, _: &mut String| seen.push(visit.entity()))
            .unwrap();
        seen.sort();
        assert_eq!(seen, (0..3).map(Entity::from_raw).collect::<Vec<_>>());
    }

    #[test]
    fn test_aliased_query_rejected() {
        let mut w = world(1);
        let err = w
            .storage
            .for_each2(w.position, w.position, |_, _: &mut Position, _: &mut Position| true)
            .unwrap_err();
        assert!(matches!(err, StorageError::AliasedQuery(id) if id == w.position));
    }

    #[test]
    fn test_wrong_type_rejected_before_visiting() {
        let mut w = world(2);
        let mut calls = 0;
        let err = w
            .storage
            .for_each(w.position, |_, _: &mut Velocity| {
                calls += 1;
                true
            })
            .unwrap_err();
        assert!(matches!(err, StorageError::TypeMismatch { .. }));
        assert_eq!(calls, 0);
    }

    fn swap_name_payload(w: &mut World, e: Entity, payload: Box<dyn Any>) {
        let record = w.storage.entities.get_mut(&e).unwrap();
        let offset = w.storage.layout.offset(record.components().bits(), w.name.index());
        let handle = record.read_handle(offset);
        record.payloads_mut().replace(handle, payload).unwrap();
    }

    #[test]
    fn test_foreign_payload_rejected_before_visiting() {
        let mut w = world(4);
        swap_name_payload(&mut w, Entity::from_raw(3), Box::new(5u64));

        let mut calls = 0;
        let err = w
            .storage
            .for_each(w.name, |_, name: &mut String| {
                calls += 1;
                name.push('!');
                true
            })
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::Component(ComponentError::PayloadMismatch { .. })
        ));
        assert_eq!(calls, 0);
        assert_eq!(
            w.storage.get::<String>(Entity::from_raw(0), w.name).unwrap(),
            "e0"
        );
    }

    #[test]
    fn test_failed_traversal_leaves_storage_untouched() {
        let mut w = world(6);
        swap_name_payload(&mut w, Entity::from_raw(4), Box::new(5u64));

        let mut calls = 0;
        let result = w
            .storage
            .for_each2(w.position, w.name, |visit, _: &mut Position, _: &mut String| {
                calls += 1;
                visit.delete();
                true
            });
        assert!(result.is_err());
        assert_eq!(calls, 0);
        assert_eq!(w.storage.len(), 6);
        for i in 0..6 {
            assert!(!w.storage.is_dirty(Entity::from_raw(i)).unwrap());
        }
    }

    #[test]
    fn test_changed_conversions() {
        assert_eq!(Changed::from(true), Changed::ALL);
        assert_eq!(Changed::from(false), Changed::NONE);
        let both = Changed::arg(0) | Changed::arg(2);
        assert!(both.contains(0));
        assert!(!both.contains(1));
        assert!(both.contains(2));
        assert!(!Changed::ALL.contains(8));
    }
}
