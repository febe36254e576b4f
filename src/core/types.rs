/*!
 * Core Types
 * Common types used across the allocator
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Byte sizes, offsets and alignments on the device side
pub type DeviceSize = u64;

/// Index of a cell within one heap
pub type CellIndex = usize;

/// Opaque classifier selecting a category of native memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryTypeId(pub u32);

impl MemoryTypeId {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    pub const fn index(self) -> u32 {
        self.0
    }
}

impl From<u32> for MemoryTypeId {
    fn from(index: u32) -> Self {
        Self(index)
    }
}

impl fmt::Display for MemoryTypeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "type#{}", self.0)
    }
}

/// Opaque handle to one native memory block, minted by a heap provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeapHandle(u64);

impl HeapHandle {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HeapHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}
