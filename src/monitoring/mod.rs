/*!
 * Monitoring
 * Structured tracing and pool growth notifications
 */

mod events;
mod tracer;

pub use events::{GrowthObserver, PoolGrowth, RecordingObserver};
pub use tracer::{init_tracing, HeapRequestSpan};
