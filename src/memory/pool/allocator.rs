/*!
 * Pool Allocation
 * First-fit search, on-demand growth and frees
 */

use super::TypedPool;
use crate::core::limits::CELLS_PER_GROUP;
use crate::core::math::{align_up, ceil_div, is_aligned};
use crate::core::types::{CellIndex, DeviceSize, HeapHandle};
use crate::memory::slot::Slot;
use crate::memory::traits::HeapProvider;
use crate::memory::types::{AllocResult, MemoryError, MemoryPressure, MemoryResult, SlotIndex};
use crate::monitoring::PoolGrowth;
use tracing::{debug, error, info, warn};

impl TypedPool {
    /// Allocate `size` bytes at an offset that is a multiple of `alignment`
    pub fn allocate<P: HeapProvider + ?Sized>(
        &mut self,
        provider: &mut P,
        size: DeviceSize,
        alignment: DeviceSize,
    ) -> MemoryResult<AllocResult> {
        let cells = self.cells_for(size);
        if cells >= self.heap_cell_count {
            error!(
                memory_type = %self.memory_type,
                size,
                cells,
                limit = self.heap_size(),
                "Allocation larger than a heap"
            );
            return Err(MemoryError::AllocationTooLarge {
                requested: size,
                cells,
                limit: self.heap_size(),
            });
        }
        let alignment = alignment.max(1);

        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Some(start) = find_run(slot, cells, self.cell_size, alignment) {
                slot.claim(start, cells);
                let offset = start as DeviceSize * self.cell_size;
                debug!(
                    memory_type = %self.memory_type,
                    heap = %slot.heap(),
                    offset,
                    size,
                    cells,
                    "Allocated"
                );
                return Ok(AllocResult {
                    heap: slot.heap(),
                    offset,
                    slot: SlotIndex(index),
                });
            }
        }

        self.grow(provider, cells)
    }

    /// Free a range, locating its slot by heap handle
    pub fn free(&mut self, heap: HeapHandle, offset: DeviceSize, size: DeviceSize) -> MemoryResult<()> {
        match self.slots.iter().position(|slot| slot.heap() == heap) {
            Some(index) => self.release(index, offset, size),
            None => {
                warn!(memory_type = %self.memory_type, heap = %heap, "Free of unknown heap");
                Err(MemoryError::InvalidHeap(heap))
            }
        }
    }

    /// Free a range through the slot index it was allocated from
    ///
    /// The heap must still match the slot, which catches stale or foreign results.
    pub fn free_in_slot(
        &mut self,
        slot: SlotIndex,
        heap: HeapHandle,
        offset: DeviceSize,
        size: DeviceSize,
    ) -> MemoryResult<()> {
        match self.slots.get(slot.0) {
            Some(found) if found.heap() == heap => self.release(slot.0, offset, size),
            _ => {
                warn!(
                    memory_type = %self.memory_type,
                    heap = %heap,
                    slot = slot.0,
                    "Free with mismatched slot"
                );
                Err(MemoryError::InvalidHeap(heap))
            }
        }
    }

    fn release(&mut self, index: usize, offset: DeviceSize, size: DeviceSize) -> MemoryResult<()> {
        let cells = self.cells_for(size);
        let heap_cell_count = self.heap_cell_count;
        let slot = &mut self.slots[index];

        let start = usize::try_from(offset / self.cell_size).unwrap_or(usize::MAX);
        if start.checked_add(cells).map_or(true, |end| end > heap_cell_count) {
            warn!(
                memory_type = %self.memory_type,
                heap = %slot.heap(),
                offset,
                size,
                "Free outside heap bounds"
            );
            return Err(MemoryError::OutOfBounds {
                heap: slot.heap(),
                offset,
                size,
            });
        }

        slot.unclaim(start, cells);
        debug!(
            memory_type = %self.memory_type,
            heap = %slot.heap(),
            offset,
            size,
            cells,
            "Freed"
        );
        Ok(())
    }

    /// No slot had room: add one, unless the cap is reached
    fn grow<P: HeapProvider + ?Sized>(
        &mut self,
        provider: &mut P,
        cells: usize,
    ) -> MemoryResult<AllocResult> {
        if self.slots.len() >= self.max_slots {
            error!(
                memory_type = %self.memory_type,
                max_slots = self.max_slots,
                "Pool exhausted"
            );
            return Err(MemoryError::PoolExhausted {
                memory_type: self.memory_type,
                max_slots: self.max_slots,
            });
        }

        let index = self.create_slot(provider)?;
        // A fresh heap is empty and cells < heap_cell_count, so the run always fits at 0
        let slot = &mut self.slots[index.0];
        slot.claim(0, cells);
        let heap = slot.heap();

        let event = PoolGrowth {
            memory_type: self.memory_type,
            heap,
            slot_count: self.slots.len(),
            max_slots: self.max_slots,
            total_bytes: self.memory_size(),
        };

        let pressure = MemoryPressure::from_ratio(event.slot_count as f64 / self.max_slots as f64);
        if pressure >= MemoryPressure::High {
            warn!(
                memory_type = %self.memory_type,
                slots = event.slot_count,
                max_slots = self.max_slots,
                total_mb = event.total_mb(),
                pressure = %pressure,
                "Created a new memory slot under pressure"
            );
        } else {
            info!(
                memory_type = %self.memory_type,
                slots = event.slot_count,
                total_mb = event.total_mb(),
                "Created a new memory slot"
            );
        }

        if let Some(observer) = &self.observer {
            observer.on_pool_growth(&event);
        }

        Ok(AllocResult {
            heap,
            offset: 0,
            slot: index,
        })
    }
}

/// First cell index starting a free, aligned run of `cells` cells
///
/// `cells` must be non-zero and smaller than the slot's cell count.
fn find_run(
    slot: &Slot,
    cells: usize,
    cell_size: DeviceSize,
    alignment: DeviceSize,
) -> Option<CellIndex> {
    let last_start = slot.cell_count() - cells;
    let mut index = 0;

    while index <= last_start {
        if index % CELLS_PER_GROUP == 0 && slot.group_full(index) {
            index += CELLS_PER_GROUP;
            continue;
        }

        let offset = index as DeviceSize * cell_size;
        if !is_aligned(offset, alignment) {
            // Jump to the first cell whose offset can be aligned
            let next = ceil_div(align_up(offset, alignment), cell_size);
            index = usize::try_from(next).unwrap_or(usize::MAX);
            continue;
        }

        if !slot.is_free(index) {
            index += 1;
            continue;
        }

        match slot.first_claimed_in(index + 1, cells - 1) {
            None => return Some(index),
            // Every run starting at or before the blocker contains it
            Some(blocker) => index = blocker + 1,
        }
    }

    None
}
