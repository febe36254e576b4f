/*!
 * Structured Tracing
 * Subscriber setup and spans around native heap requests
 */

use crate::core::limits::ENV_TRACE_JSON;
use crate::core::types::{DeviceSize, MemoryTypeId};
use std::time::{Duration, Instant};
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Native heap requests slower than this are reported
const SLOW_HEAP_REQUEST: Duration = Duration::from_millis(10);

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - HEAPSLAB_TRACE_JSON: Enable JSON output (default: false)
///
/// Safe to call more than once; later calls leave the installed subscriber alone.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var(ENV_TRACE_JSON)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true)
                    .with_file(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .is_ok()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true)
                    .with_file(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
            .is_ok()
    };

    if installed {
        info!(json = use_json, "Structured tracing initialized");
    }
}

/// Span covering one request to the native heap provider
pub struct HeapRequestSpan {
    span: tracing::Span,
    start: Instant,
}

impl HeapRequestSpan {
    pub fn new(memory_type: MemoryTypeId, size: DeviceSize) -> Self {
        let span = span!(
            Level::DEBUG,
            "heap_request",
            memory_type = %memory_type,
            size = size,
            duration_us = tracing::field::Empty,
            result = tracing::field::Empty,
        );

        Self {
            span,
            start: Instant::now(),
        }
    }

    /// Run `f` inside the span so events raised by the provider are attached to it
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        self.span.in_scope(f)
    }

    pub fn record_result(&self, success: bool) {
        self.span
            .record("result", if success { "success" } else { "error" });
    }
}

impl Drop for HeapRequestSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        let _entered = self.span.enter();
        self.span.record("duration_us", duration.as_micros() as u64);

        if duration > SLOW_HEAP_REQUEST {
            warn!(
                duration_ms = duration.as_millis() as u64,
                slow = true,
                "slow native heap request"
            );
        } else {
            debug!(
                duration_us = duration.as_micros() as u64,
                "native heap request completed"
            );
        }
    }
}
