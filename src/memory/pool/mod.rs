/*!
 * Typed Pool
 *
 * First-fit cell allocator over an append-only list of equally sized heaps, all drawn from one
 * memory type.
 *
 * ## Allocation
 *
 * - Requests are rounded up to whole cells; a request must fit inside a single heap
 * - Slots are scanned in creation order, cells from low to high
 * - Fully claimed 8-cell groups are skipped with a single byte compare
 * - Alignment is tested on the real byte offset, so any alignment value is honoured
 *
 * ## Growth
 *
 * - A new heap is requested only when no slot has a long enough free run
 * - Slots are never removed or shrunk; heaps are released only by `destroy`
 * - Growth stops at the slot cap with `PoolExhausted`
 */

mod allocator;

use super::config::AllocatorConfig;
use super::slot::Slot;
use super::traits::HeapProvider;
use super::types::{MemoryError, MemoryResult, PoolStats, SlotIndex};
use crate::core::math::ceil_div;
use crate::core::types::{DeviceSize, MemoryTypeId};
use crate::monitoring::{GrowthObserver, HeapRequestSpan};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Allocator for a single memory type
pub struct TypedPool {
    memory_type: MemoryTypeId,
    cell_size: DeviceSize,
    heap_cell_count: usize,
    max_slots: usize,
    slots: Vec<Slot>,
    observer: Option<Arc<dyn GrowthObserver>>,
}

impl TypedPool {
    /// Create a pool and eagerly request its first heap
    pub fn new<P: HeapProvider + ?Sized>(
        memory_type: MemoryTypeId,
        config: &AllocatorConfig,
        provider: &mut P,
        observer: Option<Arc<dyn GrowthObserver>>,
    ) -> MemoryResult<Self> {
        config.validate()?;

        let mut pool = Self {
            memory_type,
            cell_size: config.cell_size,
            heap_cell_count: config.heap_cell_count,
            max_slots: config.max_slots,
            slots: Vec::new(),
            observer,
        };
        pool.create_slot(provider)?;

        debug!(
            memory_type = %memory_type,
            heap_size = pool.heap_size(),
            max_slots = pool.max_slots,
            "Typed pool created"
        );
        Ok(pool)
    }

    pub fn memory_type(&self) -> MemoryTypeId {
        self.memory_type
    }

    pub fn cell_size(&self) -> DeviceSize {
        self.cell_size
    }

    pub fn heap_cell_count(&self) -> usize {
        self.heap_cell_count
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn max_slots(&self) -> usize {
        self.max_slots
    }

    /// Bytes in one heap
    pub fn heap_size(&self) -> DeviceSize {
        self.cell_size * self.heap_cell_count as DeviceSize
    }

    /// Aggregate bytes across all heaps
    pub fn memory_size(&self) -> DeviceSize {
        self.slots.len() as DeviceSize * self.heap_size()
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn stats(&self) -> PoolStats {
        let used_cells: usize = self.slots.iter().map(Slot::claimed_cells).sum();
        let total_bytes = self.memory_size();
        let used_bytes = used_cells as DeviceSize * self.cell_size;
        let usage_percentage = if total_bytes == 0 {
            0.0
        } else {
            used_bytes as f64 / total_bytes as f64 * 100.0
        };

        PoolStats {
            memory_type: self.memory_type,
            slot_count: self.slots.len(),
            max_slots: self.max_slots,
            cell_size: self.cell_size,
            heap_cell_count: self.heap_cell_count,
            total_bytes,
            used_bytes,
            free_bytes: total_bytes - used_bytes,
            usage_percentage,
        }
    }

    /// Release every heap back to the provider
    ///
    /// Outstanding allocations are not checked. Every heap is attempted; the first provider
    /// failure is returned.
    pub fn destroy<P: HeapProvider + ?Sized>(&mut self, provider: &mut P) -> MemoryResult<()> {
        let outstanding: usize = self.slots.iter().map(Slot::claimed_cells).sum();
        if outstanding > 0 {
            warn!(
                memory_type = %self.memory_type,
                outstanding_cells = outstanding,
                "Destroying pool with live allocations"
            );
        }

        let heap_size = self.heap_size();
        let mut first_error = None;
        for slot in self.slots.drain(..) {
            if let Err(source) = provider.free_heap(slot.heap()) {
                error!(
                    memory_type = %self.memory_type,
                    heap = %slot.heap(),
                    error = %source,
                    "Failed to release heap"
                );
                first_error.get_or_insert(MemoryError::NativeAllocationFailure {
                    memory_type: self.memory_type,
                    size: heap_size,
                    source,
                });
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Cells needed for `size` bytes; zero-byte requests still occupy one cell
    fn cells_for(&self, size: DeviceSize) -> usize {
        let cells = ceil_div(size, self.cell_size).max(1);
        usize::try_from(cells).unwrap_or(usize::MAX)
    }

    /// Request a heap from the provider and append it as a new slot
    fn create_slot<P: HeapProvider + ?Sized>(
        &mut self,
        provider: &mut P,
    ) -> MemoryResult<SlotIndex> {
        let size = self.heap_size();
        let request = HeapRequestSpan::new(self.memory_type, size);

        let heap = match request.in_scope(|| provider.allocate_heap(self.memory_type, size)) {
            Ok(heap) => heap,
            Err(source) => {
                request.record_result(false);
                error!(
                    memory_type = %self.memory_type,
                    size,
                    error = %source,
                    "Failed to allocate heap"
                );
                return Err(MemoryError::NativeAllocationFailure {
                    memory_type: self.memory_type,
                    size,
                    source,
                });
            }
        };
        request.record_result(true);

        self.slots.push(Slot::new(heap, self.heap_cell_count));
        Ok(SlotIndex(self.slots.len() - 1))
    }
}

impl std::fmt::Debug for TypedPool {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("TypedPool")
            .field("memory_type", &self.memory_type)
            .field("cell_size", &self.cell_size)
            .field("heap_cell_count", &self.heap_cell_count)
            .field("max_slots", &self.max_slots)
            .field("slots", &self.slots.len())
            .field("observed", &self.observer.is_some())
            .finish()
    }
}
