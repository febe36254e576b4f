/*!
 * Memory Slot
 * One native heap plus the bitmap of its claimed cells
 */

mod bitmap;

pub use bitmap::CellBitmap;

use crate::core::types::{CellIndex, HeapHandle};

/// A heap carved into equally sized cells
///
/// The slot exclusively owns its heap; the owning pool releases it on destroy.
#[derive(Debug)]
pub struct Slot {
    heap: HeapHandle,
    cells: CellBitmap,
}

impl Slot {
    pub fn new(heap: HeapHandle, cell_count: usize) -> Self {
        Self {
            heap,
            cells: CellBitmap::new(cell_count),
        }
    }

    #[inline]
    pub fn heap(&self) -> HeapHandle {
        self.heap
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_free(&self, index: CellIndex) -> bool {
        self.cells.is_free(index)
    }

    #[inline]
    pub fn group_full(&self, index: CellIndex) -> bool {
        self.cells.group_full(index)
    }

    /// First claimed cell that blocks a run of `count` cells at `start`
    #[inline]
    pub fn first_claimed_in(&self, start: CellIndex, count: usize) -> Option<CellIndex> {
        self.cells.first_claimed_in(start, count)
    }

    pub fn claim(&mut self, start: CellIndex, count: usize) {
        self.cells.claim(start, count);
    }

    pub fn unclaim(&mut self, start: CellIndex, count: usize) {
        self.cells.unclaim(start, count);
    }

    pub fn claimed_cells(&self) -> usize {
        self.cells.claimed_count()
    }
}
