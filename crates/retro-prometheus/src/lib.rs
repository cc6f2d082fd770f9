//! Prometheus metrics backend for the retraining control loop.
//!
//! [`PrometheusMetrics`] implements [`retro_core::MetricsBackend`]; inject it with `Orchestrator::with_metrics`
//! and serve [`PrometheusMetrics::encode`] from an HTTP handler.
//!
//! ## Metrics
//! - `retro_runs_started_total` - Counter
//! - `retro_runs_completed_total{result}` - Counter (`clean` / `degraded`)
//! - `retro_run_duration_seconds` - Histogram
//! - `retro_run_failed_labels` - Gauge, failed labels of the last run
//! - `retro_label_outcomes_total{label, phase, status}` - Counter
//! - `retro_job_triggers_total{kind, result}` - Counter
//! - `retro_metadata_fetch_failures_total{label}` - Counter
//! - `retro_gate_decisions_total{label, decision}` - Counter
//! - `retro_macro_f1{label, model}` - Gauge, last evaluated score per model
//!
//! ```rust
//! use std::sync::Arc;
//! use retro_core::MetricsHandle;
//! use retro_prometheus::PrometheusMetrics;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let metrics = PrometheusMetrics::new()?;
//! let handle: MetricsHandle = Arc::new(metrics.clone());
//! # let _ = handle;
//! let (body, content_type) = metrics.encode()?;
//! assert!(content_type.starts_with("text/plain"));
//! # let _ = body;
//! # Ok(())
//! # }
//! ```

mod backend;
pub use backend::PrometheusMetrics;

pub use prometheus::{Encoder, Registry, TextEncoder};
