/*!
 * Memory Traits
 * Native heap provider abstraction
 */

use crate::core::types::{DeviceSize, HeapHandle, MemoryTypeId};
use thiserror::Error;

/// Errors reported by a native heap provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("out of device memory")]
    OutOfDeviceMemory,

    #[error("native allocation count limit of {limit} reached")]
    TooManyObjects { limit: usize },

    #[error("heap {0} was not allocated by this provider")]
    UnknownHeap(HeapHandle),

    #[error("{0}")]
    Other(String),
}

/// Source of native memory blocks
///
/// Each call is expensive and the number of live heaps is capped by the driver, so pools
/// request as few heaps as possible and carve them into cells.
pub trait HeapProvider {
    /// Allocate one heap of exactly `size` bytes from the given memory type
    fn allocate_heap(
        &mut self,
        memory_type: MemoryTypeId,
        size: DeviceSize,
    ) -> Result<HeapHandle, ProviderError>;

    /// Release a heap previously returned by `allocate_heap`
    fn free_heap(&mut self, heap: HeapHandle) -> Result<(), ProviderError>;
}

impl<P: HeapProvider + ?Sized> HeapProvider for &mut P {
    fn allocate_heap(
        &mut self,
        memory_type: MemoryTypeId,
        size: DeviceSize,
    ) -> Result<HeapHandle, ProviderError> {
        (**self).allocate_heap(memory_type, size)
    }

    fn free_heap(&mut self, heap: HeapHandle) -> Result<(), ProviderError> {
        (**self).free_heap(heap)
    }
}
