use retro_model::{Decision, Label, LabelOutcome};

use crate::metrics::backend::{MetricsBackend, TriggerKind};

/// No-op metrics backend that compiles to nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMetrics;

impl MetricsBackend for NoOpMetrics {
    #[inline(always)]
    fn record_run_started(&self) {}

    #[inline(always)]
    fn record_run_completed(&self, _: u64, _: usize) {}

    #[inline(always)]
    fn record_label_outcome(&self, _: &LabelOutcome) {}

    #[inline(always)]
    fn record_trigger(&self, _: TriggerKind, _: bool) {}

    #[inline(always)]
    fn record_fetch_failure(&self, _: Label) {}

    #[inline(always)]
    fn record_decision(&self, _: Label, _: Decision, _: f64, _: f64) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_metrics_is_zero_size() {
        assert_eq!(std::mem::size_of::<NoOpMetrics>(), 0);
    }

    #[test]
    fn noop_can_be_called_repeatedly() {
        let metrics = NoOpMetrics;
        let outcome = LabelOutcome::skipped(Label::Urgency, 0);
        for _ in 0..1000 {
            metrics.record_run_started();
            metrics.record_label_outcome(&outcome);
            metrics.record_trigger(TriggerKind::Prep, true);
            metrics.record_fetch_failure(Label::Department);
            metrics.record_decision(Label::Urgency, Decision::Rejected, 0.5, 0.6);
            metrics.record_run_completed(100, 0);
        }
    }
}
