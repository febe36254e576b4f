/*!
 * Allocator Limits and Constants
 *
 * Centralized location for pool geometry defaults and pressure thresholds.
 *
 * ## Conventions
 * - Performance-relevant constants are marked with [PERF]
 * - Values imposed by native drivers are marked with [DRIVER]
 */

// =============================================================================
// POOL GEOMETRY
// =============================================================================

/// Default cell size (512 bytes)
/// Allocation granularity; every request is rounded up to whole cells
pub const DEFAULT_CELL_SIZE: u64 = 512;

/// Default number of cells per heap (8192 cells = 4MB heaps at the default cell size)
/// [PERF] Must be a multiple of 8 so the claim bitmap packs into whole bytes
pub const DEFAULT_HEAP_CELL_COUNT: usize = 8192;

/// Default cap on heaps per memory type (4096)
/// [DRIVER] Native allocation counts are capped, commonly at 4096 per device
pub const DEFAULT_MAX_SLOTS: usize = 4096;

/// Cells tracked by one bitmap byte
pub const CELLS_PER_GROUP: usize = 8;

// =============================================================================
// PRESSURE THRESHOLDS
// =============================================================================

/// Slot usage ratio reported as medium pressure
pub const MEDIUM_PRESSURE_RATIO: f64 = 0.60;

/// Slot usage ratio reported as high pressure (warn on growth)
pub const HIGH_PRESSURE_RATIO: f64 = 0.80;

/// Slot usage ratio reported as critical pressure
pub const CRITICAL_PRESSURE_RATIO: f64 = 0.95;

// =============================================================================
// ENVIRONMENT OVERRIDES
// =============================================================================

/// Overrides the cell size in bytes
pub const ENV_CELL_SIZE: &str = "HEAPSLAB_CELL_SIZE";

/// Overrides the number of cells per heap
pub const ENV_HEAP_CELLS: &str = "HEAPSLAB_HEAP_CELLS";

/// Overrides the slot cap per memory type
pub const ENV_MAX_SLOTS: &str = "HEAPSLAB_MAX_SLOTS";

/// Enables JSON trace output when set to `1` or `true`
pub const ENV_TRACE_JSON: &str = "HEAPSLAB_TRACE_JSON";
