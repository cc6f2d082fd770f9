use std::sync::Arc;

use retro_model::{Decision, Label, LabelOutcome};

/// Kind of remote job fired by the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    /// Batched dataset preparation.
    Prep,
    /// Per-label retraining.
    Retrain,
    /// Serving endpoint restart after a deploy.
    Serving,
}

impl TriggerKind {
    /// Return label value for metrics.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            TriggerKind::Prep => "prep",
            TriggerKind::Retrain => "retrain",
            TriggerKind::Serving => "serving",
        }
    }
}

/// Backend metrics collection interface.
pub trait MetricsBackend: Send + Sync + 'static {
    /// Record the start of an orchestration run.
    fn record_run_started(&self);
    /// Record the end of an orchestration run.
    ///
    /// # Arguments
    /// - `duration_ms`: wall time of the whole run
    /// - `failed_labels`: number of labels that ended in a failure state
    fn record_run_completed(&self, duration_ms: u64, failed_labels: usize);
    /// Record the terminal outcome of one label in a run.
    fn record_label_outcome(&self, outcome: &LabelOutcome);
    /// Record a job trigger attempt.
    fn record_trigger(&self, kind: TriggerKind, success: bool);
    /// Record a poll iteration whose metadata fetch exhausted its retries.
    fn record_fetch_failure(&self, label: Label);
    /// Record a challenger gate decision together with both scores.
    fn record_decision(&self, label: Label, decision: Decision, challenger_f1: f64, champion_f1: f64);
}

/// Shared handle to metrics backend.
pub type MetricsHandle = Arc<dyn MetricsBackend>;
