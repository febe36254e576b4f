/*!
 * Memory Module
 * Bitmap slab allocation over native heaps
 */

pub mod config;
pub mod manager;
pub mod pool;
pub mod provider;
pub mod selection;
pub mod slot;
pub mod traits;
pub mod types;

// Re-export for convenience
pub use config::AllocatorConfig;
pub use manager::{MemoryAllocator, SharedMemoryAllocator};
pub use pool::TypedPool;
pub use provider::{HeapRecord, SimulatedHeapProvider};
pub use selection::{find_memory_type, MemoryProperties, MemoryRequirements, MemoryTypeInfo};
pub use slot::{CellBitmap, Slot};
pub use traits::*;
pub use types::*;
