/*!
 * Cell Bitmap
 * Packed claim bits, one per cell, eight cells per byte group
 */

use crate::core::limits::CELLS_PER_GROUP;
use crate::core::types::CellIndex;

const FULL_GROUP: u8 = 0xFF;
const EMPTY_GROUP: u8 = 0x00;

/// Fixed-length bit vector recording which cells of a heap are claimed
///
/// A set bit means claimed. Length is a multiple of 8 so every byte group is complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellBitmap {
    groups: Box<[u8]>,
    len: usize,
}

impl CellBitmap {
    /// All-free bitmap of `len` cells. `len` must be a multiple of 8.
    pub fn new(len: usize) -> Self {
        debug_assert!(
            len % CELLS_PER_GROUP == 0,
            "bitmap length {} is not a multiple of {}",
            len,
            CELLS_PER_GROUP
        );
        Self {
            groups: vec![EMPTY_GROUP; len / CELLS_PER_GROUP].into_boxed_slice(),
            len,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_free(&self, index: CellIndex) -> bool {
        (self.groups[index / CELLS_PER_GROUP] >> (index % CELLS_PER_GROUP)) & 1 == 0
    }

    /// Whether every cell of the byte group containing `index` is claimed
    #[inline]
    pub fn group_full(&self, index: CellIndex) -> bool {
        self.groups[index / CELLS_PER_GROUP] == FULL_GROUP
    }

    /// First claimed cell in `[start, start + count)`, if any
    pub fn first_claimed_in(&self, start: CellIndex, count: usize) -> Option<CellIndex> {
        let end = start + count;
        let mut index = start;
        while index < end {
            if index % CELLS_PER_GROUP == 0
                && end - index >= CELLS_PER_GROUP
                && self.groups[index / CELLS_PER_GROUP] == EMPTY_GROUP
            {
                index += CELLS_PER_GROUP;
                continue;
            }
            if !self.is_free(index) {
                return Some(index);
            }
            index += 1;
        }
        None
    }

    /// Whether every cell in `[start, start + count)` is claimed
    pub fn all_claimed(&self, start: CellIndex, count: usize) -> bool {
        (start..start + count).all(|index| !self.is_free(index))
    }

    /// Mark `[start, start + count)` claimed. The range must be in bounds and currently free.
    pub fn claim(&mut self, start: CellIndex, count: usize) {
        debug_assert!(start + count <= self.len, "claim past end of bitmap");
        debug_assert!(
            self.first_claimed_in(start, count).is_none(),
            "double claim in cells {}..{}",
            start,
            start + count
        );
        self.fill(start, count, true);
    }

    /// Mark `[start, start + count)` free. The range must be in bounds and currently claimed.
    pub fn unclaim(&mut self, start: CellIndex, count: usize) {
        debug_assert!(start + count <= self.len, "unclaim past end of bitmap");
        debug_assert!(
            self.all_claimed(start, count),
            "double free in cells {}..{}",
            start,
            start + count
        );
        self.fill(start, count, false);
    }

    pub fn claimed_count(&self) -> usize {
        self.groups.iter().map(|g| g.count_ones() as usize).sum()
    }

    fn fill(&mut self, start: CellIndex, count: usize, claimed: bool) {
        let end = start + count;
        let mut index = start;
        while index < end {
            let group = index / CELLS_PER_GROUP;
            if index % CELLS_PER_GROUP == 0 && end - index >= CELLS_PER_GROUP {
                self.groups[group] = if claimed { FULL_GROUP } else { EMPTY_GROUP };
                index += CELLS_PER_GROUP;
                continue;
            }
            let mask = 1u8 << (index % CELLS_PER_GROUP);
            if claimed {
                self.groups[group] |= mask;
            } else {
                self.groups[group] &= !mask;
            }
            index += 1;
        }
    }
}
