//! Per-entity packed records.
//!
//! An [`EntityRecord`] keeps the present components of one entity in a
//! single buffer, ascending by component id, without gaps. Flat values sit
//! directly in their slot. A boxed slot holds a little-endian `u32` handle
//! into the record's [`PayloadSlab`], which owns the heap payloads.
//!
//! The buffer is a `Vec<u64>`, so its base address and every slot offset
//! (a multiple of [`SLOT_ALIGN`]) are 8-byte aligned.

use std::any::Any;
use std::fmt;

use es_component::{ComponentId, ComponentMask, HOLDER_SIZE, SLOT_ALIGN};

const WORD: usize = std::mem::size_of::<u64>();

/// Heap payloads of the boxed components of one record.
///
/// Handles are stable until the payload is taken out; freed handles are
/// reused by later insertions.
#[derive(Default)]
pub struct PayloadSlab {
    slots: Vec<Option<Box<dyn Any>>>,
    free: Vec<u32>,
}

impl PayloadSlab {
    /// Store a payload and return its handle.
    pub(crate) fn insert(&mut self, payload: Box<dyn Any>) -> u32 {
        if let Some(handle) = self.free.pop() {
            self.slots[handle as usize] = Some(payload);
            handle
        } else {
            self.slots.push(Some(payload));
            (self.slots.len() - 1) as u32
        }
    }

    /// Borrow the payload behind `handle`.
    #[must_use]
    pub fn get(&self, handle: u32) -> Option<&dyn Any> {
        self.slots.get(handle as usize)?.as_deref()
    }

    pub(crate) fn get_mut(&mut self, handle: u32) -> Option<&mut (dyn Any + 'static)> {
        self.slots.get_mut(handle as usize)?.as_deref_mut()
    }

    /// Swap in a new payload, returning the old one.
    pub(crate) fn replace(&mut self, handle: u32, payload: Box<dyn Any>) -> Option<Box<dyn Any>> {
        self.slots.get_mut(handle as usize)?.replace(payload)
    }

    /// Remove the payload behind `handle` and recycle the handle.
    pub(crate) fn take(&mut self, handle: u32) -> Option<Box<dyn Any>> {
        let payload = self.slots.get_mut(handle as usize)?.take()?;
        self.free.push(handle);
        Some(payload)
    }

    /// Number of live payloads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Returns `true` if no payload is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for PayloadSlab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadSlab")
            .field("live", &self.len())
            .field("free", &self.free.len())
            .finish()
    }
}

/// The packed component data of one entity.
#[derive(Debug)]
pub struct EntityRecord {
    components: ComponentMask,
    dirty: ComponentMask,
    data: Vec<u64>,
    len: usize,
    payloads: PayloadSlab,
}

impl EntityRecord {
    /// An empty record. Fresh records are fully dirty.
    pub(crate) fn new() -> Self {
        Self {
            components: ComponentMask::EMPTY,
            dirty: ComponentMask::FULL,
            data: Vec::new(),
            len: 0,
            payloads: PayloadSlab::default(),
        }
    }

    /// A record holding `components` with a zeroed buffer of `len` bytes.
    pub(crate) fn zeroed(components: ComponentMask, len: usize) -> Self {
        debug_assert!(len % SLOT_ALIGN == 0);
        Self {
            components,
            dirty: ComponentMask::FULL,
            data: vec![0; len / WORD],
            len,
            payloads: PayloadSlab::default(),
        }
    }

    /// Ids of the components currently present.
    #[must_use]
    pub fn components(&self) -> ComponentMask {
        self.components
    }

    /// Ids of the components changed since the last clear.
    #[must_use]
    pub fn dirty(&self) -> ComponentMask {
        self.dirty
    }

    /// Returns `true` if the component is present.
    #[must_use]
    pub fn has(&self, component: ComponentId) -> bool {
        self.components.contains(component)
    }

    /// Length in bytes of the packed buffer.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.len
    }

    /// The packed buffer.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<u64, u8>(&self.data)[..self.len]
    }

    /// The boxed payloads owned by this record.
    #[must_use]
    pub fn payloads(&self) -> &PayloadSlab {
        &self.payloads
    }

    pub(crate) fn bytes_mut(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut::<u64, u8>(&mut self.data)[..self.len]
    }

    pub(crate) fn payloads_mut(&mut self) -> &mut PayloadSlab {
        &mut self.payloads
    }

    /// Base pointer of the buffer together with the payload slab, for
    /// handing out several disjoint slots at once.
    pub(crate) fn split_mut(&mut self) -> (*mut u8, &mut PayloadSlab) {
        (self.data.as_mut_ptr().cast::<u8>(), &mut self.payloads)
    }

    pub(crate) fn set_components(&mut self, components: ComponentMask) {
        self.components = components;
    }

    pub(crate) fn set_dirty(&mut self, dirty: ComponentMask) {
        self.dirty = dirty;
    }

    pub(crate) fn mark_dirty(&mut self, component: ComponentId) {
        self.dirty.insert(component);
    }

    /// Open a zeroed slot of `stride` bytes at `offset`, shifting every
    /// following byte right.
    pub(crate) fn insert_slot(&mut self, offset: usize, stride: usize) {
        debug_assert!(offset % SLOT_ALIGN == 0 && stride % SLOT_ALIGN == 0);
        debug_assert!(offset <= self.len);
        let at = offset / WORD;
        self.data
            .splice(at..at, std::iter::repeat_n(0u64, stride / WORD));
        self.len += stride;
    }

    /// Close the slot of `stride` bytes at `offset`, shifting every
    /// following byte left.
    pub(crate) fn erase_slot(&mut self, offset: usize, stride: usize) {
        debug_assert!(offset % SLOT_ALIGN == 0 && stride % SLOT_ALIGN == 0);
        debug_assert!(offset + stride <= self.len);
        let at = offset / WORD;
        self.data.drain(at..at + stride / WORD);
        self.len -= stride;
    }

    /// Payload handle stored in the holder at `offset`.
    pub(crate) fn read_handle(&self, offset: usize) -> u32 {
        let mut raw = [0u8; HOLDER_SIZE];
        raw.copy_from_slice(&self.bytes()[offset..offset + HOLDER_SIZE]);
        u32::from_le_bytes(raw)
    }

    pub(crate) fn write_handle(&mut self, offset: usize, handle: u32) {
        self.bytes_mut()[offset..offset + HOLDER_SIZE].copy_from_slice(&handle.to_le_bytes());
    }

    /// Drop every payload, visiting holders in ascending offset order.
    ///
    /// `holders` yields the offsets of the boxed slots.
    pub(crate) fn release_payloads(&mut self, holders: impl IntoIterator<Item = usize>) {
        for offset in holders {
            let handle = self.read_handle(offset);
            drop(self.payloads.take(handle));
        }
    }
}
