/*!
 * Simulated Heap Provider
 * In-process stand-in for a device memory allocator
 */

use super::traits::{HeapProvider, ProviderError};
use crate::core::types::{DeviceSize, HeapHandle, MemoryTypeId};
use ahash::RandomState;
use std::collections::HashMap;
use tracing::debug;

/// Heap record kept by the simulated provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapRecord {
    pub memory_type: MemoryTypeId,
    pub size: DeviceSize,
}

/// Hands out sequential non-zero handles and enforces optional limits
///
/// Limits mirror what real drivers impose: a total byte budget and a cap on the number of live
/// native allocations.
#[derive(Debug)]
pub struct SimulatedHeapProvider {
    next_handle: u64,
    live: HashMap<HeapHandle, HeapRecord, RandomState>,
    budget: Option<DeviceSize>,
    max_heaps: Option<usize>,
    allocated_bytes: DeviceSize,
    total_requests: u64,
}

impl SimulatedHeapProvider {
    pub fn new() -> Self {
        Self {
            next_handle: 1,
            live: HashMap::with_hasher(RandomState::new()),
            budget: None,
            max_heaps: None,
            allocated_bytes: 0,
            total_requests: 0,
        }
    }

    /// Fail requests that would push live bytes past `budget`
    pub fn with_budget(mut self, budget: DeviceSize) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Fail requests once `max_heaps` heaps are live
    pub fn with_max_heaps(mut self, max_heaps: usize) -> Self {
        self.max_heaps = Some(max_heaps);
        self
    }

    pub fn live_heaps(&self) -> usize {
        self.live.len()
    }

    pub fn allocated_bytes(&self) -> DeviceSize {
        self.allocated_bytes
    }

    /// Number of successful `allocate_heap` calls over the provider's lifetime
    pub fn total_requests(&self) -> u64 {
        self.total_requests
    }

    pub fn heap(&self, heap: HeapHandle) -> Option<HeapRecord> {
        self.live.get(&heap).copied()
    }

    pub fn is_live(&self, heap: HeapHandle) -> bool {
        self.live.contains_key(&heap)
    }
}

impl Default for SimulatedHeapProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl HeapProvider for SimulatedHeapProvider {
    fn allocate_heap(
        &mut self,
        memory_type: MemoryTypeId,
        size: DeviceSize,
    ) -> Result<HeapHandle, ProviderError> {
        if let Some(limit) = self.max_heaps {
            if self.live.len() >= limit {
                return Err(ProviderError::TooManyObjects { limit });
            }
        }
        if let Some(budget) = self.budget {
            if self.allocated_bytes.saturating_add(size) > budget {
                return Err(ProviderError::OutOfDeviceMemory);
            }
        }

        let heap = HeapHandle::from_raw(self.next_handle);
        self.next_handle += 1;
        self.live.insert(heap, HeapRecord { memory_type, size });
        self.allocated_bytes = self.allocated_bytes.saturating_add(size);
        self.total_requests += 1;

        debug!(heap = %heap, memory_type = %memory_type, size, "Simulated heap allocated");
        Ok(heap)
    }

    fn free_heap(&mut self, heap: HeapHandle) -> Result<(), ProviderError> {
        let record = self
            .live
            .remove(&heap)
            .ok_or(ProviderError::UnknownHeap(heap))?;
        self.allocated_bytes = self.allocated_bytes.saturating_sub(record.size);

        debug!(heap = %heap, size = record.size, "Simulated heap freed");
        Ok(())
    }
}
