/*!
 * Memory Type Selection
 * Pick a memory type from a resource's type filter and required properties
 */

use super::types::{MemoryError, MemoryResult};
use crate::core::types::{DeviceSize, MemoryTypeId};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Upper bound on memory types a device can report; the type filter is a 32-bit mask
pub const MAX_MEMORY_TYPES: usize = 32;

bitflags! {
    /// Property flags of a memory type
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct MemoryProperties: u32 {
        const DEVICE_LOCAL = 1 << 0;
        const HOST_VISIBLE = 1 << 1;
        const HOST_COHERENT = 1 << 2;
        const HOST_CACHED = 1 << 3;
        const LAZILY_ALLOCATED = 1 << 4;
    }
}

/// One memory type as reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryTypeInfo {
    pub properties: MemoryProperties,
    pub heap_index: u32,
}

impl MemoryTypeInfo {
    pub fn new(properties: MemoryProperties, heap_index: u32) -> Self {
        Self {
            properties,
            heap_index,
        }
    }
}

/// What a buffer or image needs from its backing memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRequirements {
    pub size: DeviceSize,
    pub alignment: DeviceSize,
    /// Bit `i` set when memory type `i` may back the resource
    pub memory_type_bits: u32,
}

/// First memory type allowed by `type_filter` whose properties include `required`
pub fn find_memory_type(
    types: &[MemoryTypeInfo],
    type_filter: u32,
    required: MemoryProperties,
) -> MemoryResult<MemoryTypeId> {
    types
        .iter()
        .take(MAX_MEMORY_TYPES)
        .enumerate()
        .find(|(index, info)| {
            type_filter & (1u32 << *index) != 0 && info.properties.contains(required)
        })
        .map(|(index, _)| MemoryTypeId(index as u32))
        .ok_or(MemoryError::NoSuitableMemoryType {
            type_filter,
            required,
        })
}
