/*!
 * Memory Allocator
 *
 * Facade that maps memory types to lazily created pools.
 *
 * ## Lifecycle
 *
 * - A pool is created, with one heap, on the first request for its memory type
 * - Pools grow one heap at a time and never shrink
 * - `destroy` releases every heap; afterwards allocation fails with `Destroyed`
 * - Dropping an allocator that was not destroyed releases its heaps
 *
 * ## Frees
 *
 * `free` locates the slot by scanning for the heap handle. `free_allocation` uses the slot index
 * carried in the `AllocResult` and skips the scan.
 */

mod shared;

pub use shared::SharedMemoryAllocator;

use super::config::AllocatorConfig;
use super::pool::TypedPool;
use super::selection::{find_memory_type, MemoryProperties, MemoryRequirements, MemoryTypeInfo};
use super::traits::HeapProvider;
use super::types::{AllocResult, AllocatorStats, MemoryError, MemoryResult, PoolStats};
use crate::core::types::{DeviceSize, HeapHandle, MemoryTypeId};
use crate::monitoring::GrowthObserver;
use ahash::RandomState;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Pool registry owning every heap obtained from its provider
pub struct MemoryAllocator<P: HeapProvider> {
    provider: P,
    config: AllocatorConfig,
    pools: HashMap<MemoryTypeId, TypedPool, RandomState>,
    observer: Option<Arc<dyn GrowthObserver>>,
    destroyed: bool,
}

impl<P: HeapProvider> MemoryAllocator<P> {
    /// Allocator with the default geometry (512 byte cells, 4MB heaps)
    pub fn new(provider: P) -> Self {
        Self::build(provider, AllocatorConfig::default())
    }

    /// Allocator with custom geometry
    pub fn with_config(provider: P, config: AllocatorConfig) -> MemoryResult<Self> {
        config.validate()?;
        Ok(Self::build(provider, config))
    }

    fn build(provider: P, config: AllocatorConfig) -> Self {
        info!(
            cell_size = config.cell_size,
            heap_cells = config.heap_cell_count,
            heap_size = config.heap_size(),
            max_slots = config.max_slots,
            "Memory allocator initialized"
        );
        Self {
            provider,
            config,
            pools: HashMap::with_hasher(RandomState::new()),
            observer: None,
            destroyed: false,
        }
    }

    /// Add a pool growth observer
    pub fn with_observer(mut self, observer: Arc<dyn GrowthObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Set the observer after construction; applies to pools created afterwards
    pub fn set_observer(&mut self, observer: Arc<dyn GrowthObserver>) {
        self.observer = Some(observer);
    }

    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Allocate `size` bytes of `memory_type` at an offset that is a multiple of `alignment`
    ///
    /// Pass an alignment of 1 when the caller has no requirement.
    pub fn allocate(
        &mut self,
        memory_type: MemoryTypeId,
        size: DeviceSize,
        alignment: DeviceSize,
    ) -> MemoryResult<AllocResult> {
        if self.destroyed {
            return Err(MemoryError::Destroyed);
        }

        let pool = match self.pools.entry(memory_type) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let pool = TypedPool::new(
                    memory_type,
                    &self.config,
                    &mut self.provider,
                    self.observer.clone(),
                )?;
                entry.insert(pool)
            }
        };

        pool.allocate(&mut self.provider, size, alignment)
    }

    /// Pick a memory type for `requirements` and allocate from it
    ///
    /// Returns the chosen type alongside the result; the caller needs it to free.
    pub fn allocate_for(
        &mut self,
        requirements: &MemoryRequirements,
        required: MemoryProperties,
        memory_types: &[MemoryTypeInfo],
    ) -> MemoryResult<(MemoryTypeId, AllocResult)> {
        let memory_type = find_memory_type(memory_types, requirements.memory_type_bits, required)?;
        let result = self.allocate(memory_type, requirements.size, requirements.alignment)?;
        Ok((memory_type, result))
    }

    /// Free a range given the exact heap, offset and size returned by `allocate`
    pub fn free(
        &mut self,
        heap: HeapHandle,
        memory_type: MemoryTypeId,
        offset: DeviceSize,
        size: DeviceSize,
    ) -> MemoryResult<()> {
        self.pools
            .get_mut(&memory_type)
            .ok_or(MemoryError::InvalidHeap(heap))?
            .free(heap, offset, size)
    }

    /// Free through the slot index carried by `result`
    pub fn free_allocation(
        &mut self,
        memory_type: MemoryTypeId,
        result: &AllocResult,
        size: DeviceSize,
    ) -> MemoryResult<()> {
        self.pools
            .get_mut(&memory_type)
            .ok_or(MemoryError::InvalidHeap(result.heap))?
            .free_in_slot(result.slot, result.heap, result.offset, size)
    }

    /// Release every heap of every pool
    ///
    /// Outstanding allocations are not checked; free them first. Every pool is attempted and the
    /// first provider failure is returned.
    pub fn destroy(&mut self) -> MemoryResult<()> {
        if self.destroyed {
            return Ok(());
        }
        self.destroyed = true;

        let heaps: usize = self.pools.values().map(TypedPool::slot_count).sum();
        let mut first_error = None;
        for (_, mut pool) in self.pools.drain() {
            if let Err(err) = pool.destroy(&mut self.provider) {
                first_error.get_or_insert(err);
            }
        }

        info!(heaps, "Memory allocator destroyed");
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn pool_stats(&self, memory_type: MemoryTypeId) -> Option<PoolStats> {
        self.pools.get(&memory_type).map(TypedPool::stats)
    }

    pub fn stats(&self) -> AllocatorStats {
        let mut pools: Vec<PoolStats> = self.pools.values().map(TypedPool::stats).collect();
        pools.sort_by_key(|p| p.memory_type);

        AllocatorStats {
            total_bytes: pools.iter().map(|p| p.total_bytes).sum(),
            used_bytes: pools.iter().map(|p| p.used_bytes).sum(),
            pools,
        }
    }
}

impl<P: HeapProvider> Drop for MemoryAllocator<P> {
    fn drop(&mut self) {
        if self.destroyed || self.pools.is_empty() {
            return;
        }
        warn!(
            pools = self.pools.len(),
            "Memory allocator dropped without destroy; releasing heaps"
        );
        if let Err(err) = self.destroy() {
            warn!(error = %err, "Failed to release heaps on drop");
        }
    }
}

impl<P: HeapProvider + std::fmt::Debug> std::fmt::Debug for MemoryAllocator<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("MemoryAllocator")
            .field("provider", &self.provider)
            .field("config", &self.config)
            .field("pools", &self.pools.len())
            .field("destroyed", &self.destroyed)
            .finish()
    }
}
