/*!
 * Memory Types
 * Common types for pool allocation
 */

use super::traits::ProviderError;
use crate::core::limits::{CRITICAL_PRESSURE_RATIO, HIGH_PRESSURE_RATIO, MEDIUM_PRESSURE_RATIO};
use crate::core::types::{DeviceSize, HeapHandle, MemoryTypeId};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Memory operation result
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Memory errors
///
/// Every variant is fatal to the resource-creation operation that raised it.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum MemoryError {
    #[error("Invalid pool configuration: {0}")]
    #[diagnostic(
        code(memory::configuration),
        help("heap cell count must be a non-zero multiple of 8, cell size and slot cap non-zero")
    )]
    Configuration(String),

    #[error("Attempted to allocate {requested} bytes ({cells} cells), more than slot limit of {limit} bytes")]
    #[diagnostic(
        code(memory::allocation_too_large),
        help("A single allocation must fit inside one heap. Raise the heap cell count or use a dedicated allocation.")
    )]
    AllocationTooLarge {
        requested: DeviceSize,
        cells: usize,
        limit: DeviceSize,
    },

    #[error("Pool for {memory_type} exhausted: all {max_slots} slots are full")]
    #[diagnostic(
        code(memory::pool_exhausted),
        help("Free unused resources or raise the slot cap.")
    )]
    PoolExhausted {
        memory_type: MemoryTypeId,
        max_slots: usize,
    },

    #[error("Invalid heap: {0}")]
    #[diagnostic(
        code(memory::invalid_heap),
        help("The heap is not owned by this pool. Check for double free, a foreign allocator, or use after destroy.")
    )]
    InvalidHeap(HeapHandle),

    #[error("Failed to allocate {size} byte heap for {memory_type}: {source}")]
    #[diagnostic(
        code(memory::native_allocation_failure),
        help("The native heap provider refused the request. No retry is attempted.")
    )]
    NativeAllocationFailure {
        memory_type: MemoryTypeId,
        size: DeviceSize,
        #[source]
        source: ProviderError,
    },

    #[error("Range at offset {offset} ({size} bytes) lies outside heap {heap}")]
    #[diagnostic(
        code(memory::out_of_bounds),
        help("Pass back the exact (heap, offset, size) triple returned by allocate.")
    )]
    OutOfBounds {
        heap: HeapHandle,
        offset: DeviceSize,
        size: DeviceSize,
    },

    #[error("No memory type in filter 0b{type_filter:b} supports the required properties {required:?}")]
    #[diagnostic(
        code(memory::no_suitable_memory_type),
        help("Relax the required property flags or pick a different resource usage.")
    )]
    NoSuitableMemoryType {
        type_filter: u32,
        required: super::selection::MemoryProperties,
    },

    #[error("Allocator has been destroyed")]
    #[diagnostic(
        code(memory::destroyed),
        help("All heaps were released by destroy(); create a new allocator.")
    )]
    Destroyed,
}

/// Location of a live allocation
///
/// Conveys a location, not ownership. The allocator keeps the heap; the only valid lifecycle
/// action for the caller is to free it with the same heap, offset and size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AllocResult {
    pub heap: HeapHandle,
    pub offset: DeviceSize,
    /// Index of the owning slot within its pool, for frees that skip the heap scan
    pub slot: SlotIndex,
}

/// Stable position of a slot within its pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotIndex(pub usize);

/// Per-pool statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolStats {
    pub memory_type: MemoryTypeId,
    pub slot_count: usize,
    pub max_slots: usize,
    pub cell_size: DeviceSize,
    pub heap_cell_count: usize,
    pub total_bytes: DeviceSize,
    pub used_bytes: DeviceSize,
    pub free_bytes: DeviceSize,
    pub usage_percentage: f64,
}

impl PoolStats {
    /// Pressure measured against the slot cap, i.e. distance to PoolExhausted
    pub fn memory_pressure(&self) -> MemoryPressure {
        MemoryPressure::from_ratio(self.slot_count as f64 / self.max_slots as f64)
    }
}

/// Statistics across every pool of an allocator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllocatorStats {
    pub pools: Vec<PoolStats>,
    pub total_bytes: DeviceSize,
    pub used_bytes: DeviceSize,
}

impl AllocatorStats {
    pub fn slot_count(&self) -> usize {
        self.pools.iter().map(|p| p.slot_count).sum()
    }
}

/// Memory pressure levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MemoryPressure {
    Low,
    Medium,
    High,
    Critical,
}

impl MemoryPressure {
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio >= CRITICAL_PRESSURE_RATIO {
            MemoryPressure::Critical
        } else if ratio >= HIGH_PRESSURE_RATIO {
            MemoryPressure::High
        } else if ratio >= MEDIUM_PRESSURE_RATIO {
            MemoryPressure::Medium
        } else {
            MemoryPressure::Low
        }
    }
}

impl std::fmt::Display for MemoryPressure {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            MemoryPressure::Low => write!(f, "LOW"),
            MemoryPressure::Medium => write!(f, "MEDIUM"),
            MemoryPressure::High => write!(f, "HIGH"),
            MemoryPressure::Critical => write!(f, "CRITICAL"),
        }
    }
}
