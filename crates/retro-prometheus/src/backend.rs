use std::sync::Arc;

use prometheus::{
    CounterVec, Encoder, GaugeVec, Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry,
    TextEncoder, proto::MetricFamily,
};

use retro_core::{MetricsBackend, TriggerKind};
use retro_model::{Decision, Label, LabelOutcome};

const NAMESPACE: &str = "retro";

/// Prometheus implementation of [`MetricsBackend`].
///
/// Label cardinality is bounded: `label` is one of the classifier heads, `phase`/`status` come from fixed enums.
#[derive(Clone)]
pub struct PrometheusMetrics {
    runs_started: IntCounter,
    runs_completed: CounterVec,
    run_duration: Histogram,
    run_failed_labels: IntGauge,
    label_outcomes: CounterVec,
    triggers: CounterVec,
    fetch_failures: CounterVec,
    decisions: CounterVec,
    macro_f1: GaugeVec,
    registry: Arc<Registry>,
}

fn opts(name: &str, help: &str) -> Opts {
    Opts::new(name, help).namespace(NAMESPACE)
}

fn decision_label(decision: Decision) -> &'static str {
    match decision {
        Decision::Accepted => "accepted",
        Decision::Rejected => "rejected",
    }
}

impl PrometheusMetrics {
    /// Register all collectors in `registry`.
    pub fn new_with_registry(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        let runs_started = IntCounter::with_opts(opts(
            "runs_started_total",
            "Orchestration runs started",
        ))?;
        registry.register(Box::new(runs_started.clone()))?;

        let runs_completed = CounterVec::new(
            opts("runs_completed_total", "Orchestration runs completed"),
            &["result"],
        )?;
        registry.register(Box::new(runs_completed.clone()))?;

        // A run spans dataset preparation and retraining, so buckets reach hours.
        let run_duration = Histogram::with_opts(
            HistogramOpts::new("run_duration_seconds", "Orchestration run wall time in seconds")
                .namespace(NAMESPACE)
                .buckets(vec![1.0, 10.0, 60.0, 300.0, 900.0, 1800.0, 3600.0, 7200.0]),
        )?;
        registry.register(Box::new(run_duration.clone()))?;

        let run_failed_labels = IntGauge::with_opts(opts(
            "run_failed_labels",
            "Labels that failed in the most recent run",
        ))?;
        registry.register(Box::new(run_failed_labels.clone()))?;

        let label_outcomes = CounterVec::new(
            opts("label_outcomes_total", "Terminal label outcomes per run"),
            &["label", "phase", "status"],
        )?;
        registry.register(Box::new(label_outcomes.clone()))?;

        let triggers = CounterVec::new(
            opts("job_triggers_total", "Remote job trigger attempts"),
            &["kind", "result"],
        )?;
        registry.register(Box::new(triggers.clone()))?;

        let fetch_failures = CounterVec::new(
            opts(
                "metadata_fetch_failures_total",
                "Poll iterations whose metadata fetch exhausted its retries",
            ),
            &["label"],
        )?;
        registry.register(Box::new(fetch_failures.clone()))?;

        let decisions = CounterVec::new(
            opts("gate_decisions_total", "Challenger gate decisions"),
            &["label", "decision"],
        )?;
        registry.register(Box::new(decisions.clone()))?;

        let macro_f1 = GaugeVec::new(
            opts("macro_f1", "Last evaluated macro F1 score"),
            &["label", "model"],
        )?;
        registry.register(Box::new(macro_f1.clone()))?;

        Ok(Self {
            runs_started,
            runs_completed,
            run_duration,
            run_failed_labels,
            label_outcomes,
            triggers,
            fetch_failures,
            decisions,
            macro_f1,
            registry,
        })
    }

    /// Create a backend with its own registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::new_with_registry(Arc::new(Registry::new()))
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Encode all metrics in the text exposition format.
    ///
    /// Returns the body and its content type.
    pub fn encode(&self) -> Result<(Vec<u8>, String), prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        encoder.encode(&self.gather(), &mut buf)?;
        Ok((buf, encoder.format_type().to_string()))
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl MetricsBackend for PrometheusMetrics {
    fn record_run_started(&self) {
        self.runs_started.inc();
    }

    fn record_run_completed(&self, duration_ms: u64, failed_labels: usize) {
        let result = if failed_labels == 0 { "clean" } else { "degraded" };
        self.runs_completed.with_label_values(&[result]).inc();
        self.run_duration.observe(duration_ms as f64 / 1000.0);
        self.run_failed_labels
            .set(i64::try_from(failed_labels).unwrap_or(i64::MAX));
    }

    fn record_label_outcome(&self, outcome: &LabelOutcome) {
        self.label_outcomes
            .with_label_values(&[
                outcome.label.as_str(),
                outcome.phase.as_str(),
                outcome.status.as_str(),
            ])
            .inc();
    }

    fn record_trigger(&self, kind: TriggerKind, success: bool) {
        let result = if success { "ok" } else { "error" };
        self.triggers
            .with_label_values(&[kind.as_label(), result])
            .inc();
    }

    fn record_fetch_failure(&self, label: Label) {
        self.fetch_failures.with_label_values(&[label.as_str()]).inc();
    }

    fn record_decision(&self, label: Label, decision: Decision, challenger_f1: f64, champion_f1: f64) {
        self.decisions
            .with_label_values(&[label.as_str(), decision_label(decision)])
            .inc();
        self.macro_f1
            .with_label_values(&[label.as_str(), "challenger"])
            .set(challenger_f1);
        self.macro_f1
            .with_label_values(&[label.as_str(), "champion"])
            .set(champion_f1);
    }
}
