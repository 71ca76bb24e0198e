//! # es_component
//!
//! Identity and type description for the packed entity store.
//!
//! This crate provides:
//!
//! - [`Entity`]: lightweight `u32` entity identifiers.
//! - [`EntityAllocator`]: strictly increasing ID allocator.
//! - [`ComponentId`] and [`ComponentMask`]: positional component ids and
//!   the 64-bit sets built from them.
//! - [`ComponentDescriptor`]: name, slot geometry and kind of a component
//!   type, with the [`BoxedOps`] table for boxed types.
//! - [`BoxedComponent`] and the [`codec`] helpers: per-type serialization
//!   hooks.

pub mod codec;
pub mod component;
pub mod entity;
pub mod error;
pub mod mask;

pub use codec::BoxedComponent;
pub use component::{
    BoxedOps, ComponentDescriptor, ComponentId, ComponentKind, HOLDER_SIZE, MAX_COMPONENTS,
    SLOT_ALIGN, TypeInfo, stride_for,
};
pub use entity::{Entity, EntityAllocator, EntityRange};
pub use error::ComponentError;
pub use mask::{ComponentMask, MaskIter};
