/*!
 * Heapslab
 * Fixed-pool bitmap sub-allocator for native memory heaps
 *
 * A handful of large native heaps per memory type are carved into fixed-size cells, so callers
 * needing many small buffer or image allocations avoid one expensive, count-capped native
 * allocation per object.
 */

pub mod core;
pub mod memory;
pub mod monitoring;

// Re-exports
pub use crate::core::types::{DeviceSize, HeapHandle, MemoryTypeId};
pub use memory::{
    AllocResult, AllocatorConfig, AllocatorStats, HeapProvider, MemoryAllocator, MemoryError,
    MemoryResult, PoolStats, ProviderError, SharedMemoryAllocator, SimulatedHeapProvider,
};
pub use monitoring::{init_tracing, GrowthObserver, PoolGrowth, RecordingObserver};
