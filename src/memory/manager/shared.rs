/*!
 * Shared Allocator
 * Mutex-guarded handle for allocators used from more than one thread
 */

use super::MemoryAllocator;
use crate::core::types::{DeviceSize, HeapHandle, MemoryTypeId};
use crate::memory::traits::HeapProvider;
use crate::memory::types::{AllocResult, AllocatorStats, MemoryResult, PoolStats};
use parking_lot::Mutex;
use std::sync::Arc;

/// Cloneable handle serializing every operation on one allocator
///
/// Pool and slot mutation happen under a single lock; each call runs to completion before the
/// next starts.
pub struct SharedMemoryAllocator<P: HeapProvider> {
    inner: Arc<Mutex<MemoryAllocator<P>>>,
}

impl<P: HeapProvider> SharedMemoryAllocator<P> {
    pub fn new(allocator: MemoryAllocator<P>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(allocator)),
        }
    }

    pub fn allocate(
        &self,
        memory_type: MemoryTypeId,
        size: DeviceSize,
        alignment: DeviceSize,
    ) -> MemoryResult<AllocResult> {
        self.inner.lock().allocate(memory_type, size, alignment)
    }

    pub fn free(
        &self,
        heap: HeapHandle,
        memory_type: MemoryTypeId,
        offset: DeviceSize,
        size: DeviceSize,
    ) -> MemoryResult<()> {
        self.inner.lock().free(heap, memory_type, offset, size)
    }

    pub fn free_allocation(
        &self,
        memory_type: MemoryTypeId,
        result: &AllocResult,
        size: DeviceSize,
    ) -> MemoryResult<()> {
        self.inner.lock().free_allocation(memory_type, result, size)
    }

    pub fn destroy(&self) -> MemoryResult<()> {
        self.inner.lock().destroy()
    }

    pub fn stats(&self) -> AllocatorStats {
        self.inner.lock().stats()
    }

    pub fn pool_stats(&self, memory_type: MemoryTypeId) -> Option<PoolStats> {
        self.inner.lock().pool_stats(memory_type)
    }

    /// Run several operations under one lock acquisition
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut MemoryAllocator<P>) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

impl<P: HeapProvider> Clone for SharedMemoryAllocator<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: HeapProvider> From<MemoryAllocator<P>> for SharedMemoryAllocator<P> {
    fn from(allocator: MemoryAllocator<P>) -> Self {
        Self::new(allocator)
    }
}
