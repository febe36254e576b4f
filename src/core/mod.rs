/*!
 * Core Module
 * Fundamental allocator types, limits and arithmetic
 */

pub mod limits;
pub mod math;
pub mod types;

// Re-export for convenience
pub use math::{align_up, ceil_div, is_aligned};
pub use types::*;
