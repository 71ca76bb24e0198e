//! Binary record format.
//!
//! ```text
//! [presence mask: u64 LE] [component 0] [component 1] ...
//! ```
//!
//! Components follow in ascending id order. A flat component is its `size`
//! raw bytes; a boxed component is whatever its encode hook wrote. The mask
//! is positional, so both sides must have registered the same components
//! in the same order.

use std::any::Any;

use es_component::{ComponentError, ComponentId, ComponentKind, ComponentMask, Entity};
use tracing::{debug, trace};

use crate::error::{Result, StorageError};
use crate::record::EntityRecord;
use crate::storage::Storage;

const HEADER_LEN: usize = std::mem::size_of::<u64>();

impl Storage {
    /// Encode `entity`'s components.
    ///
    /// # Errors
    ///
    /// - [`StorageError::UnknownEntity`] if `entity` does not exist.
    /// - [`StorageError::SerializationNotImplemented`] if a present boxed
    ///   component has no encode hook.
    pub fn serialize(&self, entity: Entity) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.serialize_into(entity, &mut out)?;
        Ok(out)
    }

    /// Append the encoding of `entity` to `out`.
    ///
    /// On failure `out` is restored to its original length.
    ///
    /// # Errors
    ///
    /// Same as [`Storage::serialize`].
    pub fn serialize_into(&self, entity: Entity, out: &mut Vec<u8>) -> Result<()> {
        let start = out.len();
        let result = self.encode_record(entity, out);
        if result.is_err() {
            out.truncate(start);
        }
        result
    }

    fn encode_record(&self, entity: Entity, out: &mut Vec<u8>) -> Result<()> {
        let record = self.record(entity)?;
        let mask = record.components();
        out.reserve(HEADER_LEN + record.byte_len());
        out.extend_from_slice(&mask.bits().to_le_bytes());

        for id in mask {
            let descriptor = self.descriptor(id)?;
            let offset = self.layout.offset(mask.bits(), id.index());
            match descriptor.kind() {
                ComponentKind::Flat => {
                    out.extend_from_slice(&record.bytes()[offset..offset + descriptor.size()]);
                }
                ComponentKind::Boxed => {
                    let ops = descriptor.ops().ok_or(StorageError::UnknownComponent(id))?;
                    let payload = record
                        .payloads()
                        .get(record.read_handle(offset))
                        .ok_or(ComponentError::PayloadMismatch {
                            expected: descriptor.type_name(),
                        })?;
                    (ops.encode_fn)(payload, out).map_err(|err| codec_error(id, err))?;
                }
            }
        }
        Ok(())
    }

    /// Replace `entity`'s components with the decoded contents of `bytes`.
    ///
    /// The buffer is decoded completely before the entity is touched. Every
    /// component that was or is now present is marked dirty.
    ///
    /// # Errors
    ///
    /// - [`StorageError::UnknownEntity`] if `entity` does not exist.
    /// - [`StorageError::UnknownComponent`] if the mask names an
    ///   unregistered component.
    /// - [`StorageError::TruncatedData`] or [`StorageError::TrailingData`]
    ///   for badly framed input.
    /// - [`StorageError::SerializationNotImplemented`] if a boxed component
    ///   has no decode hook.
    pub fn deserialize(&mut self, entity: Entity, bytes: &[u8]) -> Result<()> {
        if !self.exists(entity) {
            return Err(StorageError::UnknownEntity(entity));
        }
        let decoded = self.decode_logged(entity, bytes)?;
        self.replace_record(entity, decoded);
        Ok(())
    }

    /// Materialise an entity at a known id from serialized bytes.
    ///
    /// An existing entity is overwritten as with [`Storage::deserialize`];
    /// otherwise a new entity is created, the allocator advanced past `id`,
    /// and the creation hook run.
    ///
    /// # Errors
    ///
    /// Same as [`Storage::deserialize`], apart from `UnknownEntity`.
    pub fn create_from_bytes(&mut self, id: u32, bytes: &[u8]) -> Result<Entity> {
        let entity = Entity::from_raw(id);
        let decoded = self.decode_logged(entity, bytes)?;
        if self.exists(entity) {
            self.replace_record(entity, decoded);
        } else {
            self.allocator.reserve(entity);
            self.insert_record(entity, decoded);
        }
        Ok(entity)
    }

    fn replace_record(&mut self, entity: Entity, mut decoded: EntityRecord) {
        let Some(current) = self.entities.get_mut(&entity) else {
            return;
        };
        decoded.set_dirty(current.dirty() | current.components() | decoded.components());
        let mut old = std::mem::replace(current, decoded);
        self.release(&mut old);
    }

    fn decode_logged(&self, entity: Entity, bytes: &[u8]) -> Result<EntityRecord> {
        let decoded = self.decode_record(bytes).inspect_err(|err| {
            debug!(entity = %entity, len = bytes.len(), error = %err, "rejected serialized record");
        })?;
        trace!(entity = %entity, components = decoded.components().len(), "decoded record");
        Ok(decoded)
    }

    fn decode_record(&self, bytes: &[u8]) -> Result<EntityRecord> {
        let Some((header, mut rest)) = bytes.split_first_chunk::<HEADER_LEN>() else {
            return Err(StorageError::TruncatedData {
                needed: HEADER_LEN,
                remaining: bytes.len(),
            });
        };
        let mask = ComponentMask::from_bits(u64::from_le_bytes(*header));
        if let Some(unknown) = (mask & !ComponentMask::first(self.component_count())).iter().next()
        {
            return Err(StorageError::UnknownComponent(unknown));
        }

        let mut record = EntityRecord::zeroed(mask, self.layout.record_len(mask.bits()));
        for id in mask {
            let descriptor = &self.descriptors[id.index()];
            let offset = self.layout.offset(mask.bits(), id.index());
            match descriptor.kind() {
                ComponentKind::Flat => {
                    let size = descriptor.size();
                    let Some((value, tail)) = rest.split_at_checked(size) else {
                        return Err(StorageError::TruncatedData {
                            needed: size,
                            remaining: rest.len(),
                        });
                    };
                    record.bytes_mut()[offset..offset + size].copy_from_slice(value);
                    rest = tail;
                }
                ComponentKind::Boxed => {
                    let ops = descriptor.ops().ok_or(StorageError::UnknownComponent(id))?;
                    let (payload, consumed) =
                        (ops.decode_fn)(rest).map_err(|err| codec_error(id, err))?;
                    if descriptor
                        .type_info()
                        .is_some_and(|info| (*payload).type_id() != info.id)
                    {
                        return Err(ComponentError::PayloadMismatch {
                            expected: descriptor.type_name(),
                        }
                        .into());
                    }
                    let tail = rest.get(consumed..).ok_or(StorageError::TruncatedData {
                        needed: consumed,
                        remaining: rest.len(),
                    })?;
                    let handle = record.payloads_mut().insert(payload);
                    record.write_handle(offset, handle);
                    rest = tail;
                }
            }
        }

        if !rest.is_empty() {
            return Err(StorageError::TrailingData {
                remaining: rest.len(),
            });
        }
        Ok(record)
    }
}

/// Map a codec failure onto the storage error for component `id`.
fn codec_error(id: ComponentId, err: ComponentError) -> StorageError {
    match err {
        ComponentError::NotImplemented { .. } => {
            StorageError::SerializationNotImplemented { component: id }
        }
        ComponentError::Truncated { needed, remaining } => {
            StorageError::TruncatedData { needed, remaining }
        }
        other => StorageError::Component(other),
    }
}

#[cfg(test)]
mod tests {
    use es_component::{BoxedComponent, BoxedOps, ComponentDescriptor};

    use super::*;

    #[derive(Clone)]
    struct Opaque(u64);

    impl BoxedComponent for Opaque {}

    #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Inventory {
        items: Vec<String>,
        gold: u32,
    }

    fn storage() -> (Storage, ComponentId, ComponentId) {
        let mut storage = Storage::new();
        let health = storage.register_flat::<i32>("health").unwrap();
        let name = storage.register_boxed::<String>("name").unwrap();
        (storage, health, name)
    }

    #[test]
    fn test_layout_of_encoding() {
        let (mut s, health, name) = storage();
        let e = s.create().unwrap();
        s.set(e, health, 20i32).unwrap();
        s.set(e, name, String::from("Timmy")).unwrap();

        let bytes = s.serialize(e).unwrap();
        let mut expected = 0b11u64.to_le_bytes().to_vec();
        expected.extend_from_slice(&20i32.to_le_bytes());
        expected.extend_from_slice(&[5, 0, 0, 0]);
        expected.extend_from_slice(b"Timmy");
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_empty_entity_is_only_a_header() {
        let (mut s, _, _) = storage();
        let e = s.create().unwrap();
        assert_eq!(s.serialize(e).unwrap(), vec![0; 8]);
    }

    #[test]
    fn test_deserialize_replaces_and_marks_dirty() {
        let (mut s, health, name) = storage();
        let source = s.create().unwrap();
        s.set(source, health, 7i32).unwrap();
        let bytes = s.serialize(source).unwrap();

        let target = s.create().unwrap();
        s.set(target, name, String::from("old")).unwrap();
        s.clear_dirty(target).unwrap();

        s.deserialize(target, &bytes).unwrap();
        assert_eq!(*s.get::<i32>(target, health).unwrap(), 7);
        assert!(!s.has(target, name));
        assert!(s.is_component_dirty(target, health).unwrap());
        assert!(s.is_component_dirty(target, name).unwrap());
        assert_eq!(s.record(target).unwrap().payloads().len(), 0);
    }

    #[test]
    fn test_truncated_header() {
        let (mut s, _, _) = storage();
        let e = s.create().unwrap();
        assert!(matches!(
            s.deserialize(e, &[1, 0, 0]),
            Err(StorageError::TruncatedData { needed: 8, remaining: 3 })
        ));
    }

    #[test]
    fn test_truncated_flat_value_leaves_entity_untouched() {
        let (mut s, health, _) = storage();
        let e = s.create().unwrap();
        s.set(e, health, 1i32).unwrap();

        let mut bytes = 1u64.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[9, 9]);
        assert!(matches!(
            s.deserialize(e, &bytes),
            Err(StorageError::TruncatedData { needed: 4, remaining: 2 })
        ));
        assert_eq!(*s.get::<i32>(e, health).unwrap(), 1);
    }

    #[test]
    fn test_truncated_boxed_value() {
        let (mut s, _, name) = storage();
        let e = s.create().unwrap();
        s.set(e, name, String::from("Timmy")).unwrap();
        let mut bytes = s.serialize(e).unwrap();
        bytes.pop();

        let f = s.create().unwrap();
        assert!(matches!(
            s.deserialize(f, &bytes),
            Err(StorageError::TruncatedData { .. })
        ));
    }

    #[test]
    fn test_trailing_data() {
        let (mut s, health, _) = storage();
        let e = s.create().unwrap();
        s.set(e, health, 1i32).unwrap();
        let mut bytes = s.serialize(e).unwrap();
        bytes.push(0);
        assert!(matches!(
            s.deserialize(e, &bytes),
            Err(StorageError::TrailingData { remaining: 1 })
        ));
    }

    #[test]
    fn test_unregistered_component_in_mask() {
        let (mut s, _, _) = storage();
        let e = s.create().unwrap();
        let bytes = (1u64 << 5).to_le_bytes();
        assert!(matches!(
            s.deserialize(e, &bytes),
            Err(StorageError::UnknownComponent(id)) if id.get() == 5
        ));
    }

    #[test]
    fn test_missing_hooks() {
        let mut s = Storage::new();
        let opaque = s.register_boxed::<Opaque>("opaque").unwrap();
        let e = s.create().unwrap();
        s.set(e, opaque, Opaque(3)).unwrap();

        let mut out = vec![0xAB];
        assert!(matches!(
            s.serialize_into(e, &mut out),
            Err(StorageError::SerializationNotImplemented { component }) if component == opaque
        ));
        assert_eq!(out, vec![0xAB]);

        let mut bytes = 1u64.to_le_bytes().to_vec();
        bytes.push(0);
        assert!(matches!(
            s.deserialize(e, &bytes),
            Err(StorageError::SerializationNotImplemented { .. })
        ));
        assert_eq!(s.get::<Opaque>(e, opaque).unwrap().0, 3);
    }

    #[test]
    fn test_decoded_payload_of_wrong_type_rejected() {
        let mut s = Storage::new();
        let name = s
            .register(ComponentDescriptor::boxed_with::<String>(
                "name",
                BoxedOps::msgpack::<u64>(),
            ))
            .unwrap();
        let e = s.create().unwrap();

        let mut bytes = 1u64.to_le_bytes().to_vec();
        bytes.push(0xcf);
        bytes.extend_from_slice(&[0x41; 8]);
        assert!(matches!(
            s.deserialize(e, &bytes),
            Err(StorageError::Component(ComponentError::PayloadMismatch { .. }))
        ));
        assert!(!s.has(e, name));
        assert!(s.create_from_bytes(9, &bytes).is_err());
        assert!(!s.exists(Entity::from_raw(9)));
    }

    #[test]
    fn test_msgpack_component_roundtrip() {
        let mut s = Storage::new();
        let level = s.register_flat::<u16>("level").unwrap();
        let inventory = s
            .register(ComponentDescriptor::boxed_msgpack::<Inventory>("inventory"))
            .unwrap();
        let e = s.create().unwrap();
        let value = Inventory {
            items: vec!["rope".into(), "lamp".into()],
            gold: 12,
        };
        s.set(e, inventory, value.clone()).unwrap();
        s.set(e, level, 3u16).unwrap();

        let bytes = s.serialize(e).unwrap();
        let f = s.create_from_bytes(40, &bytes).unwrap();
        assert_eq!(s.get::<Inventory>(f, inventory).unwrap(), &value);
        assert_eq!(*s.get::<u16>(f, level).unwrap(), 3);
        assert_eq!(s.create().unwrap(), Entity::from_raw(41));
    }

    #[test]
    fn test_create_from_bytes_overwrites_existing() {
        let (mut s, health, _) = storage();
        let e = s.create().unwrap();
        s.set(e, health, 1i32).unwrap();
        let bytes = s.serialize(e).unwrap();

        let f = s.create().unwrap();
        s.set(f, health, 2i32).unwrap();
        assert_eq!(s.create_from_bytes(f.id(), &bytes).unwrap(), f);
        assert_eq!(*s.get::<i32>(f, health).unwrap(), 1);
        assert_eq!(s.len(), 2);
    }
}
