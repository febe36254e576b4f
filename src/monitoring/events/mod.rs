/*!
 * Pool Events
 * Growth notifications delivered to an injected observer
 */

use crate::core::types::{DeviceSize, HeapHandle, MemoryTypeId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Emitted whenever a pool has to request a new heap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolGrowth {
    pub memory_type: MemoryTypeId,
    /// The heap just added
    pub heap: HeapHandle,
    /// Slot count after growth
    pub slot_count: usize,
    pub max_slots: usize,
    /// Aggregate pool size after growth
    pub total_bytes: DeviceSize,
}

impl PoolGrowth {
    pub fn total_mb(&self) -> DeviceSize {
        self.total_bytes / (1024 * 1024)
    }
}

/// Receives pool growth notifications
///
/// Purely observational; an observer cannot veto or alter growth.
pub trait GrowthObserver: Send + Sync {
    fn on_pool_growth(&self, event: &PoolGrowth);
}

impl<F> GrowthObserver for F
where
    F: Fn(&PoolGrowth) + Send + Sync,
{
    fn on_pool_growth(&self, event: &PoolGrowth) {
        self(event)
    }
}

/// Observer that keeps every event it sees
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<PoolGrowth>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PoolGrowth> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl GrowthObserver for RecordingObserver {
    fn on_pool_growth(&self, event: &PoolGrowth) {
        self.events.lock().push(event.clone());
    }
}
