//! Component ids, descriptors, and the type-erased operation table.
//!
//! A component is registered with a storage through a
//! [`ComponentDescriptor`]. The descriptor is all a storage ever consults to
//! interpret the bytes of a slot: its [`ComponentKind`] says whether the slot
//! holds the value itself (flat) or a handle to a heap payload (boxed), and
//! for boxed kinds its [`BoxedOps`] carry the clone and codec operations
//! bound to the concrete Rust type at registration time.
//!
//! ## Slot geometry
//!
//! Every slot starts on an [`SLOT_ALIGN`]-byte boundary. A descriptor's
//! `stride` is its `size` rounded up to that boundary, and record buffers
//! are word-backed, so a typed reference into a slot is always aligned for
//! any flat type accepted by [`ComponentDescriptor::flat`].

use std::any::{Any, TypeId};
use std::fmt;

use bytemuck::Pod;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::codec::{self, BoxedComponent};
use crate::error::ComponentError;

/// Hard limit on component types per storage (one bit each in a `u64`).
pub const MAX_COMPONENTS: usize = 64;

/// Alignment, in bytes, of every slot inside a record buffer.
pub const SLOT_ALIGN: usize = 8;

/// Bytes a boxed holder occupies: a little-endian `u32` payload handle.
pub const HOLDER_SIZE: usize = 4;

/// Small integer id of a registered component, in `0..64`.
///
/// Ids are positional: the n-th registered component has id n.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u8);

impl ComponentId {
    /// Wrap an index, or `None` if it is outside `0..64`.
    #[must_use]
    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < MAX_COMPONENTS {
            Some(Self(index))
        } else {
            None
        }
    }

    /// The raw id.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// The id as a table index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// The id's bit inside a [`crate::ComponentMask`].
    #[must_use]
    pub const fn bit(self) -> u64 {
        1u64 << self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a component's value lives inside a record buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    /// Plain bytes, copied and moved verbatim.
    Flat,
    /// A holder referencing a heap payload owned by the record.
    Boxed,
}

/// Rust identity of a registered component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeInfo {
    /// The type's [`TypeId`].
    pub id: TypeId,
    /// The type's name, for diagnostics.
    pub name: &'static str,
}

impl TypeInfo {
    /// Identity of `T`.
    #[must_use]
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }
}

/// Type-erased operations for a boxed component.
///
/// Each function is monomorphised for one concrete type; handing it a
/// payload of another type yields [`ComponentError::PayloadMismatch`].
/// Destroying a payload is dropping its box, so there is no destructor
/// entry.
#[derive(Clone, Copy)]
pub struct BoxedOps {
    /// Produce an independent deep copy of a payload.
    pub clone_fn: fn(&dyn Any) -> Result<Box<dyn Any>, ComponentError>,
    /// Append the payload's wire encoding to the output buffer.
    pub encode_fn: fn(&dyn Any, &mut Vec<u8>) -> Result<(), ComponentError>,
    /// Decode a payload from the front of the input, returning it together
    /// with the number of bytes consumed.
    pub decode_fn: fn(&[u8]) -> Result<(Box<dyn Any>, usize), ComponentError>,
}

impl BoxedOps {
    /// Operations driven by `T`'s [`BoxedComponent`] implementation.
    #[must_use]
    pub fn of<T: BoxedComponent>() -> Self {
        Self {
            clone_fn: clone_payload::<T>,
            encode_fn: encode_payload::<T>,
            decode_fn: decode_payload::<T>,
        }
    }

    /// Operations that persist `T` as MessagePack.
    #[must_use]
    pub fn msgpack<T>() -> Self
    where
        T: Any + Clone + Serialize + DeserializeOwned,
    {
        Self {
            clone_fn: clone_payload::<T>,
            encode_fn: encode_msgpack_payload::<T>,
            decode_fn: decode_msgpack_payload::<T>,
        }
    }
}

impl fmt::Debug for BoxedOps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxedOps").finish_non_exhaustive()
    }
}

fn downcast<T: Any>(payload: &dyn Any) -> Result<&T, ComponentError> {
    payload
        .downcast_ref::<T>()
        .ok_or(ComponentError::PayloadMismatch {
            expected: std::any::type_name::<T>(),
        })
}

fn clone_payload<T: Any + Clone>(payload: &dyn Any) -> Result<Box<dyn Any>, ComponentError> {
    let value = downcast::<T>(payload)?;
    Ok(Box::new(value.clone()))
}

fn encode_payload<T: BoxedComponent>(
    payload: &dyn Any,
    out: &mut Vec<u8>,
) -> Result<(), ComponentError> {
    downcast::<T>(payload)?.encode(out)
}

fn decode_payload<T: BoxedComponent>(input: &[u8]) -> Result<(Box<dyn Any>, usize), ComponentError> {
    let (value, consumed) = T::decode(input)?;
    Ok((Box::new(value), consumed))
}

fn encode_msgpack_payload<T: Any + Serialize>(
    payload: &dyn Any,
    out: &mut Vec<u8>,
) -> Result<(), ComponentError> {
    codec::encode_msgpack(downcast::<T>(payload)?, out)
}

fn decode_msgpack_payload<T: Any + DeserializeOwned>(
    input: &[u8],
) -> Result<(Box<dyn Any>, usize), ComponentError> {
    let (value, consumed) = codec::decode_msgpack::<T>(input)?;
    Ok((Box::new(value), consumed))
}

/// Round `size` up to the next slot boundary, saturating at `usize::MAX`.
#[must_use]
pub const fn stride_for(size: usize) -> usize {
    match size.checked_next_multiple_of(SLOT_ALIGN) {
        Some(stride) => stride,
        None => usize::MAX,
    }
}

/// Static metadata for one registered component type.
///
/// Immutable once built. A storage assigns the id; the descriptor only
/// knows the name, the geometry and how to operate on values.
#[derive(Debug, Clone)]
pub struct ComponentDescriptor {
    name: String,
    size: usize,
    stride: usize,
    kind: ComponentKind,
    type_info: Option<TypeInfo>,
    ops: Option<BoxedOps>,
}

impl ComponentDescriptor {
    /// Describe a flat component.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::Alignment`] if `T` needs more than
    /// [`SLOT_ALIGN`]-byte alignment.
    pub fn flat<T: Pod>(name: impl Into<String>) -> Result<Self, ComponentError> {
        let align = std::mem::align_of::<T>();
        if align > SLOT_ALIGN {
            return Err(ComponentError::Alignment {
                type_name: std::any::type_name::<T>(),
                align,
                max: SLOT_ALIGN,
            });
        }
        let size = std::mem::size_of::<T>();
        Ok(Self {
            name: name.into(),
            size,
            stride: stride_for(size),
            kind: ComponentKind::Flat,
            type_info: Some(TypeInfo::of::<T>()),
            ops: None,
        })
    }

    /// Describe a boxed component whose hooks come from its
    /// [`BoxedComponent`] implementation.
    #[must_use]
    pub fn boxed<T: BoxedComponent>(name: impl Into<String>) -> Self {
        Self::boxed_with::<T>(name, BoxedOps::of::<T>())
    }

    /// Describe a boxed component persisted as MessagePack.
    #[must_use]
    pub fn boxed_msgpack<T>(name: impl Into<String>) -> Self
    where
        T: Any + Clone + Serialize + DeserializeOwned,
    {
        Self::boxed_with::<T>(name, BoxedOps::msgpack::<T>())
    }

    /// Describe a boxed component with an explicit operation table.
    ///
    /// `ops` must have been built for `T`; otherwise every operation fails
    /// with [`ComponentError::PayloadMismatch`].
    #[must_use]
    pub fn boxed_with<T: Any>(name: impl Into<String>, ops: BoxedOps) -> Self {
        Self {
            name: name.into(),
            size: HOLDER_SIZE,
            stride: stride_for(HOLDER_SIZE),
            kind: ComponentKind::Boxed,
            type_info: Some(TypeInfo::of::<T>()),
            ops: Some(ops),
        }
    }

    /// Describe an untyped flat component of `size` bytes.
    ///
    /// Raw components are only reachable through byte-level accessors.
    #[must_use]
    pub fn raw(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            size,
            stride: stride_for(size),
            kind: ComponentKind::Flat,
            type_info: None,
            ops: None,
        }
    }

    /// Unique name used for lookup.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wire width in bytes: the native size for flat types, the holder size
    /// for boxed ones.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Width of the slot inside a record buffer.
    #[must_use]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Flat or boxed.
    #[must_use]
    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    /// Returns `true` for flat components.
    #[must_use]
    pub fn is_flat(&self) -> bool {
        self.kind == ComponentKind::Flat
    }

    /// Rust identity, absent for raw components.
    #[must_use]
    pub fn type_info(&self) -> Option<TypeInfo> {
        self.type_info
    }

    /// Name of the Rust type, or `"<raw>"`.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_info.map_or("<raw>", |info| info.name)
    }

    /// Operation table of a boxed component.
    #[must_use]
    pub fn ops(&self) -> Option<&BoxedOps> {
        self.ops.as_ref()
    }

    /// Returns `true` if values of `T` may be stored under this descriptor.
    #[must_use]
    pub fn accepts<T: Any>(&self) -> bool {
        self.type_info
            .is_some_and(|info| info.id == TypeId::of::<T>())
    }
}
