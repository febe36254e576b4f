/*!
 * Allocator Configuration
 * Pool geometry with validation and environment overrides
 */

use super::types::{MemoryError, MemoryResult};
use crate::core::limits::{
    CELLS_PER_GROUP, DEFAULT_CELL_SIZE, DEFAULT_HEAP_CELL_COUNT, DEFAULT_MAX_SLOTS, ENV_CELL_SIZE,
    ENV_HEAP_CELLS, ENV_MAX_SLOTS,
};
use crate::core::types::DeviceSize;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Geometry shared by every pool of an allocator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
    /// Bytes per cell
    pub cell_size: DeviceSize,
    /// Cells per heap; must be a multiple of 8
    pub heap_cell_count: usize,
    /// Maximum heaps per memory type
    pub max_slots: usize,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            cell_size: DEFAULT_CELL_SIZE,
            heap_cell_count: DEFAULT_HEAP_CELL_COUNT,
            max_slots: DEFAULT_MAX_SLOTS,
        }
    }
}

impl AllocatorConfig {
    pub fn new(cell_size: DeviceSize, heap_cell_count: usize, max_slots: usize) -> Self {
        Self {
            cell_size,
            heap_cell_count,
            max_slots,
        }
    }

    pub fn with_cell_size(mut self, cell_size: DeviceSize) -> Self {
        self.cell_size = cell_size;
        self
    }

    pub fn with_heap_cell_count(mut self, heap_cell_count: usize) -> Self {
        self.heap_cell_count = heap_cell_count;
        self
    }

    pub fn with_max_slots(mut self, max_slots: usize) -> Self {
        self.max_slots = max_slots;
        self
    }

    /// Defaults overridden by `HEAPSLAB_CELL_SIZE`, `HEAPSLAB_HEAP_CELLS` and `HEAPSLAB_MAX_SLOTS`
    pub fn from_env() -> MemoryResult<Self> {
        let defaults = Self::default();
        let config = Self {
            cell_size: env_or(ENV_CELL_SIZE, defaults.cell_size)?,
            heap_cell_count: env_or(ENV_HEAP_CELLS, defaults.heap_cell_count)?,
            max_slots: env_or(ENV_MAX_SLOTS, defaults.max_slots)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> MemoryResult<()> {
        if self.cell_size == 0 {
            return Err(MemoryError::Configuration(
                "cell size must be non-zero".to_string(),
            ));
        }
        if self.heap_cell_count == 0 || self.heap_cell_count % CELLS_PER_GROUP != 0 {
            return Err(MemoryError::Configuration(format!(
                "heap must be a multiple of {} cells, got {}",
                CELLS_PER_GROUP, self.heap_cell_count
            )));
        }
        if self.max_slots == 0 {
            return Err(MemoryError::Configuration(
                "slot cap must be at least 1".to_string(),
            ));
        }
        if self.cell_size.checked_mul(self.heap_cell_count as DeviceSize).is_none() {
            return Err(MemoryError::Configuration(format!(
                "heap size of {} x {} bytes overflows",
                self.heap_cell_count, self.cell_size
            )));
        }
        Ok(())
    }

    /// Size in bytes of every heap requested from the provider
    pub fn heap_size(&self) -> DeviceSize {
        self.cell_size * self.heap_cell_count as DeviceSize
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> MemoryResult<T> {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| {
            MemoryError::Configuration(format!("{} is not a valid number: {:?}", key, raw))
        }),
        Err(_) => Ok(default),
    }
}
