//! Offset computation for packed entity records.
//!
//! A record stores its present components back to back in ascending id
//! order, so the byte offset of component `c` is the summed stride of every
//! present component with a lower id. [`OffsetCache`] answers that question
//! from a lookup table for the low `window` ids, indexed directly by the
//! presence bits, and walks only the set bits above the window.
//!
//! The table is indexed purely by bitmask: entry `m` holds the summed
//! stride of the components named by `m`. Registering the k-th component
//! (k below the window) doubles the table, the new upper half being the old
//! table shifted by that component's stride.

/// Largest supported cache window; the table then has 65 536 entries.
pub const MAX_CACHE_WINDOW: u8 = 16;

/// Default number of component ids covered by the cache.
pub const DEFAULT_CACHE_WINDOW: u8 = 12;

/// Stride table plus the bitmask-indexed offset cache.
#[derive(Debug, Clone)]
pub struct OffsetCache {
    window: u32,
    window_mask: u64,
    table: Vec<u32>,
    strides: Vec<u32>,
}

impl OffsetCache {
    /// Create an empty cache covering the first `window` component ids.
    ///
    /// `window` is clamped to [`MAX_CACHE_WINDOW`].
    #[must_use]
    pub fn new(window: u8) -> Self {
        let window = u32::from(window.min(MAX_CACHE_WINDOW));
        Self {
            window,
            window_mask: (1u64 << window) - 1,
            table: vec![0],
            strides: Vec::new(),
        }
    }

    /// Number of low component ids served from the table.
    #[must_use]
    pub fn window(&self) -> u32 {
        self.window
    }

    /// Number of table entries currently populated.
    #[must_use]
    pub fn table_len(&self) -> usize {
        self.table.len()
    }

    /// Number of components registered with the cache.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strides.len()
    }

    /// Returns `true` if no component has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strides.is_empty()
    }

    /// Stride of component `index`.
    #[must_use]
    pub fn stride(&self, index: usize) -> usize {
        self.strides[index] as usize
    }

    /// Register the next component id with the given slot stride.
    pub fn push(&mut self, stride: u32) {
        let index = self.strides.len() as u32;
        self.strides.push(stride);

        if index < self.window {
            let half = self.table.len();
            self.table.reserve(half);
            for j in 0..half {
                let shifted = self.table[j] + stride;
                self.table.push(shifted);
            }
        }
    }

    /// Byte offset of component `index` inside a record with presence `mask`.
    ///
    /// The result does not depend on whether `index` itself is present, so
    /// it is also the insertion point for a component being added.
    #[inline]
    #[must_use]
    pub fn offset(&self, mask: u64, index: usize) -> usize {
        debug_assert!(index < self.strides.len());
        let below = mask & ((1u64 << index) - 1);
        let mut offset = self.table[(below & self.window_mask) as usize];

        let mut tail = below & !self.window_mask;
        while tail != 0 {
            offset += self.strides[tail.trailing_zeros() as usize];
            tail &= tail - 1;
        }
        offset as usize
    }

    /// Total byte length of a record with presence `mask`.
    #[inline]
    #[must_use]
    pub fn record_len(&self, mask: u64) -> usize {
        let mut len = self.table[(mask & self.window_mask) as usize];

        let mut tail = mask & !self.window_mask;
        while tail != 0 {
            len += self.strides[tail.trailing_zeros() as usize];
            tail &= tail - 1;
        }
        len as usize
    }

    /// Reference offset by plain accumulation over every lower id.
    #[must_use]
    pub fn linear_offset(&self, mask: u64, index: usize) -> usize {
        (0..index)
            .filter(|&c| mask & (1u64 << c) != 0)
            .map(|c| self.strides[c] as usize)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Small deterministic generator so mask sweeps are reproducible.
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self) -> u64 {
            self.0 = self
                .0
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            self.0
        }
    }

    fn cache_with(window: u8, strides: &[u32]) -> OffsetCache {
        let mut cache = OffsetCache::new(window);
        for &s in strides {
            cache.push(s);
        }
        cache
    }

    #[test]
    fn test_table_grows_only_inside_window() {
        let cache = cache_with(3, &[8, 8, 8, 8, 8]);
        assert_eq!(cache.table_len(), 8);
        assert_eq!(cache.len(), 5);
    }

    #[test]
    fn test_offsets_for_simple_layout() {
        // health(8) position(16) name(8)
        let cache = cache_with(12, &[8, 16, 8]);
        assert_eq!(cache.offset(0b111, 0), 0);
        assert_eq!(cache.offset(0b111, 1), 8);
        assert_eq!(cache.offset(0b111, 2), 24);
        assert_eq!(cache.offset(0b101, 2), 8);
        assert_eq!(cache.offset(0b100, 2), 0);
        assert_eq!(cache.record_len(0b111), 32);
        assert_eq!(cache.record_len(0), 0);
    }

    #[test]
    fn test_offset_of_absent_component_is_insertion_point() {
        let cache = cache_with(12, &[8, 16, 8]);
        // Component 1 absent: it would be inserted right after component 0.
        assert_eq!(cache.offset(0b101, 1), 8);
    }

    #[test]
    fn test_cache_matches_linear_scan_for_every_count() {
        let mut rng = Lcg(0x5EED);
        for count in 1..=64usize {
            let strides: Vec<u32> = (0..count).map(|_| (rng.next() % 5) as u32 * 8).collect();
            let cache = cache_with(DEFAULT_CACHE_WINDOW, &strides);
            let registered = if count == 64 {
                u64::MAX
            } else {
                (1u64 << count) - 1
            };

            for _ in 0..200 {
                let mask = rng.next() & registered;
                for index in 0..count {
                    assert_eq!(
                        cache.offset(mask, index),
                        cache.linear_offset(mask, index),
                        "count {count}, mask {mask:#x}, index {index}"
                    );
                }
                assert_eq!(cache.record_len(mask), cache.linear_offset(mask, count));
            }
        }
    }

    #[test]
    fn test_every_window_size_agrees() {
        let strides: Vec<u32> = (0..20).map(|i| ((i % 3) + 1) * 8).collect();
        let mut rng = Lcg(7);
        for window in 0..=MAX_CACHE_WINDOW {
            let cache = cache_with(window, &strides);
            for _ in 0..100 {
                let mask = rng.next() & ((1u64 << 20) - 1);
                for index in 0..20 {
                    assert_eq!(cache.offset(mask, index), cache.linear_offset(mask, index));
                }
            }
        }
    }

    #[test]
    fn test_exhaustive_small_masks() {
        let cache = cache_with(4, &[8, 0, 24, 8, 16, 8]);
        for mask in 0u64..64 {
            for index in 0..6 {
                assert_eq!(cache.offset(mask, index), cache.linear_offset(mask, index));
            }
        }
    }

    #[test]
    fn test_window_is_clamped() {
        let cache = OffsetCache::new(40);
        assert_eq!(cache.window(), u32::from(MAX_CACHE_WINDOW));
    }
}
