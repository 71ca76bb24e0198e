//! Fixed-width component bitmasks.
//!
//! A [`ComponentMask`] records one bit per [`ComponentId`]. Storages use it
//! for the per-entity presence and dirty sets, and to mark which registered
//! components are boxed. The width is a single machine word, which is what
//! caps a storage at [`MAX_COMPONENTS`] component types.

use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

use serde::{Deserialize, Serialize};

use crate::component::{ComponentId, MAX_COMPONENTS};

/// A set of component ids packed into a `u64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ComponentMask(u64);

impl ComponentMask {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Every possible component id.
    pub const FULL: Self = Self(u64::MAX);

    /// Wrap raw bits.
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// The raw bits.
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Set containing only `id`.
    #[must_use]
    pub const fn single(id: ComponentId) -> Self {
        Self(id.bit())
    }

    /// Set containing ids `0..count`.
    #[must_use]
    pub const fn first(count: usize) -> Self {
        if count >= MAX_COMPONENTS {
            Self::FULL
        } else {
            Self((1u64 << count) - 1)
        }
    }

    /// Returns `true` if `id` is in the set.
    #[must_use]
    pub const fn contains(self, id: ComponentId) -> bool {
        self.0 & id.bit() != 0
    }

    /// Returns `true` if every id of `other` is also in `self`.
    #[must_use]
    pub const fn contains_all(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if `self` and `other` share at least one id.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Add `id` to the set.
    pub fn insert(&mut self, id: ComponentId) {
        self.0 |= id.bit();
    }

    /// Remove `id` from the set.
    pub fn remove(&mut self, id: ComponentId) {
        self.0 &= !id.bit();
    }

    /// Returns `true` if no id is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of ids in the set.
    #[must_use]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterate over the contained ids in ascending order.
    #[must_use]
    pub fn iter(self) -> MaskIter {
        MaskIter(self.0)
    }
}

impl BitOr for ComponentMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ComponentMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ComponentMask {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Not for ComponentMask {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl FromIterator<ComponentId> for ComponentMask {
    fn from_iter<I: IntoIterator<Item = ComponentId>>(iter: I) -> Self {
        let mut mask = Self::EMPTY;
        for id in iter {
            mask.insert(id);
        }
        mask
    }
}

impl IntoIterator for ComponentMask {
    type Item = ComponentId;
    type IntoIter = MaskIter;

    fn into_iter(self) -> MaskIter {
        self.iter()
    }
}

/// Ascending iterator over the ids of a [`ComponentMask`].
#[derive(Debug, Clone)]
pub struct MaskIter(u64);

impl Iterator for MaskIter {
    type Item = ComponentId;

    fn next(&mut self) -> Option<ComponentId> {
        if self.0 == 0 {
            return None;
        }
        let index = self.0.trailing_zeros() as u8;
        self.0 &= self.0 - 1;
        ComponentId::new(index)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.0.count_ones() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for MaskIter {}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(index: u8) -> ComponentId {
        ComponentId::new(index).unwrap()
    }

    #[test]
    fn test_insert_remove_contains() {
        let mut mask = ComponentMask::EMPTY;
        mask.insert(id(0));
        mask.insert(id(63));
        assert!(mask.contains(id(0)));
        assert!(mask.contains(id(63)));
        assert!(!mask.contains(id(1)));
        assert_eq!(mask.len(), 2);

        mask.remove(id(0));
        assert!(!mask.contains(id(0)));
        assert_eq!(mask.bits(), 1u64 << 63);
    }

    #[test]
    fn test_iter_is_ascending() {
        let mask: ComponentMask = [id(40), id(3), id(17), id(0)].into_iter().collect();
        let order: Vec<u8> = mask.iter().map(ComponentId::get).collect();
        assert_eq!(order, vec![0, 3, 17, 40]);
        assert_eq!(mask.iter().len(), 4);
    }

    #[test]
    fn test_superset_check() {
        let have: ComponentMask = [id(1), id(2), id(5)].into_iter().collect();
        let want: ComponentMask = [id(1), id(5)].into_iter().collect();
        assert!(have.contains_all(want));
        assert!(!want.contains_all(have));
        assert!(have.contains_all(ComponentMask::EMPTY));
    }

    #[test]
    fn test_first() {
        assert_eq!(ComponentMask::first(0), ComponentMask::EMPTY);
        assert_eq!(ComponentMask::first(3).bits(), 0b111);
        assert_eq!(ComponentMask::first(64), ComponentMask::FULL);
    }
}
