//! Metrics collection abstraction for the control loop.
//!
//! Backends (prometheus, etc) implement [`MetricsBackend`] and are injected into the [`crate::Orchestrator`] and the retrain path.
mod backend;
pub use backend::{MetricsBackend, MetricsHandle, TriggerKind};

mod noop;
pub use noop::NoOpMetrics;

use std::sync::Arc;

/// Create a no-op metrics handle.
#[inline]
pub fn noop_metrics() -> MetricsHandle {
    Arc::new(NoOpMetrics)
}
