//! Top-level driver of one orchestration run.
//!
//! A run evaluates every configured label, fires one batched dataset-prep job for the flagged ones, then waits for each flagged label's dataset and triggers its retrain job concurrently. Failures stay local to their label.
mod label;

use std::sync::{Arc, RwLock};

use time::OffsetDateTime;
use tokio::{
    sync::{Mutex, OwnedMutexGuard},
    task::JoinHandle,
    time::Instant,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use retro_model::{LabelOutcome, LabelPhase, LabelPipeline, RunSummary};

use crate::{
    config::OrchestratorConfig,
    error::RunError,
    metrics::{MetricsHandle, TriggerKind, noop_metrics},
    monitor::{MisclassificationSource, ThresholdMonitor},
    poller::{DatasetPoller, MetadataSource},
    trigger::TriggerHandle,
};

use label::LabelTask;

pub struct Orchestrator {
    cfg: Arc<OrchestratorConfig>,
    monitor: ThresholdMonitor,
    metadata: Arc<dyn MetadataSource>,
    poller: Arc<DatasetPoller>,
    trigger: TriggerHandle,
    metrics: MetricsHandle,
    cancel: CancellationToken,
    running: Arc<Mutex<()>>,
    last: RwLock<Option<RunSummary>>,
}

impl Orchestrator {
    pub fn new(
        cfg: OrchestratorConfig,
        counts: Arc<dyn MisclassificationSource>,
        metadata: Arc<dyn MetadataSource>,
        trigger: TriggerHandle,
    ) -> Self {
        let poller = DatasetPoller::new(Arc::clone(&metadata), cfg.fetch_retry);
        Self {
            cfg: Arc::new(cfg),
            monitor: ThresholdMonitor::new(counts),
            metadata,
            poller: Arc::new(poller),
            trigger,
            metrics: noop_metrics(),
            cancel: CancellationToken::new(),
            running: Arc::new(Mutex::new(())),
            last: RwLock::new(None),
        }
    }

    /// Replace the metrics backend (also used by the dataset poller).
    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        let poller = DatasetPoller::new(Arc::clone(&self.metadata), self.cfg.fetch_retry)
            .with_metrics(Arc::clone(&metrics));
        self.poller = Arc::new(poller);
        self.metrics = metrics;
        self
    }

    /// Use `cancel` as the parent of every label task.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.cfg
    }

    /// Returns `true` while a run is in progress.
    pub fn is_running(&self) -> bool {
        self.running.try_lock().is_err()
    }

    /// Summary of the last finished run.
    pub fn last_summary(&self) -> Option<RunSummary> {
        match self.last.read() {
            Ok(last) => last.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Execute one orchestration run.
    ///
    /// Fails only with [`RunError::AlreadyRunning`]; every label failure is reported in the summary.
    pub async fn run_once(&self) -> Result<RunSummary, RunError> {
        let guard = self.try_claim()?;
        Ok(self.execute(guard).await)
    }

    /// Claim the run slot and execute the run on a background task.
    ///
    /// The slot is taken before returning, so a second call fails immediately with [`RunError::AlreadyRunning`].
    pub fn spawn_run(self: &Arc<Self>) -> Result<JoinHandle<RunSummary>, RunError> {
        let guard = self.try_claim()?;
        let this = Arc::clone(self);
        Ok(tokio::spawn(async move { this.execute(guard).await }))
    }

    fn try_claim(&self) -> Result<OwnedMutexGuard<()>, RunError> {
        Arc::clone(&self.running)
            .try_lock_owned()
            .map_err(|_| RunError::AlreadyRunning)
    }

    #[instrument(level = "info", skip_all, fields(run_id = tracing::field::Empty))]
    async fn execute(&self, _guard: OwnedMutexGuard<()>) -> RunSummary {
        let run_id = uuid::Uuid::new_v4().to_string();
        tracing::Span::current().record("run_id", run_id.as_str());
        let started = Instant::now();
        let mut summary = RunSummary::new(run_id, OffsetDateTime::now_utc());
        self.metrics.record_run_started();
        info!(labels = self.cfg.pipelines.len(), dry_run = self.cfg.dry_run, "orchestration run started");

        let flagged = self.evaluate_thresholds(&mut summary).await;
        if flagged.is_empty() {
            info!("no label exceeded its threshold");
        } else if let Some(outcomes) = self.trigger_prep(&flagged).await {
            for o in outcomes {
                summary.record(o);
            }
        } else {
            for o in self.drive_labels(flagged).await {
                summary.record(o);
            }
        }

        summary.finished_at = OffsetDateTime::now_utc();
        self.finish(&summary, started);
        summary
    }

    /// Record skipped and failed labels, return the flagged ones with their required length.
    async fn evaluate_thresholds(&self, summary: &mut RunSummary) -> Vec<(LabelPipeline, u64)> {
        let mut flagged = Vec::new();
        for pipeline in &self.cfg.pipelines {
            match self.monitor.evaluate(pipeline).await {
                Ok(v) if v.needs_prep => {
                    info!(label = %v.label, phase = %LabelPhase::ThresholdExceeded, required_len = v.required_len, "label flagged");
                    flagged.push((pipeline.clone(), v.required_len));
                }
                Ok(v) => summary.record(LabelOutcome::skipped(v.label, v.required_len)),
                Err(e) => {
                    warn!(label = %pipeline.label, error = %e, "threshold evaluation failed");
                    summary.record(LabelOutcome::failed(pipeline.label, LabelPhase::Idle, 0, e.to_string()));
                }
            }
        }
        flagged
    }

    /// Fire the batched prep job. Returns the failure outcomes if it could not be triggered.
    async fn trigger_prep(&self, flagged: &[(LabelPipeline, u64)]) -> Option<Vec<LabelOutcome>> {
        let labels = flagged
            .iter()
            .map(|(p, _)| p.label.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let prep_job = &flagged[0].0.prep_job;

        match self.trigger.trigger(prep_job, &labels).await {
            Ok(handle) => {
                self.metrics.record_trigger(TriggerKind::Prep, true);
                info!(job_ref = %handle.job_ref, labels = %labels, dry_run = handle.dry_run, phase = %LabelPhase::PrepTriggered, "dataset preparation triggered");
                None
            }
            Err(e) => {
                self.metrics.record_trigger(TriggerKind::Prep, false);
                error!(job_ref = %prep_job, labels = %labels, error = %e, "dataset preparation trigger failed");
                Some(
                    flagged
                        .iter()
                        .map(|(p, required_len)| {
                            LabelOutcome::failed(p.label, LabelPhase::PrepTriggerFailed, *required_len, e.to_string())
                        })
                        .collect(),
                )
            }
        }
    }

    /// One task per flagged label; results fan in once all of them finished.
    ///
    /// Dropping the returned future cancels the label tasks.
    async fn drive_labels(&self, flagged: Vec<(LabelPipeline, u64)>) -> Vec<LabelOutcome> {
        let run_cancel = self.cancel.child_token();
        let _cancel_on_drop = run_cancel.clone().drop_guard();

        let handles: Vec<_> = flagged
            .into_iter()
            .map(|(pipeline, required_len)| {
                let label = pipeline.label;
                let task = LabelTask {
                    pipeline,
                    required_len,
                    poller: Arc::clone(&self.poller),
                    trigger: Arc::clone(&self.trigger),
                    metrics: Arc::clone(&self.metrics),
                    poll_interval: self.cfg.poll_interval,
                    poll_timeout: self.cfg.poll_timeout,
                    cancel: run_cancel.child_token(),
                };
                (label, required_len, tokio::spawn(task.run()))
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (label, required_len, handle) in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    error!(%label, error = %e, "label task aborted");
                    outcomes.push(LabelOutcome::failed(
                        label,
                        LabelPhase::WaitingForDataset,
                        required_len,
                        format!("label task aborted: {e}"),
                    ));
                }
            }
        }
        outcomes
    }

    fn finish(&self, summary: &RunSummary, started: Instant) {
        for o in summary.outcomes.values() {
            self.metrics.record_label_outcome(o);
            let version_tag = o.snapshot.as_ref().map(|s| s.version_tag.as_str());
            info!(
                run_id = %summary.run_id,
                label = %o.label,
                phase = %o.phase,
                status = %o.status,
                required_len = o.required_len,
                version_tag = ?version_tag,
                error = ?o.error,
                "label summary"
            );
        }

        let failed = summary.failed_labels().len();
        let duration_ms = started.elapsed().as_millis() as u64;
        self.metrics.record_run_completed(duration_ms, failed);
        info!(run_id = %summary.run_id, failed, duration_ms, "orchestration run finished");

        match self.last.write() {
            Ok(mut last) => *last = Some(summary.clone()),
            Err(poisoned) => *poisoned.into_inner() = Some(summary.clone()),
        }
        debug!("last summary stored");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixedCounts, RecordingTrigger, ScriptedMetadata, config, pipeline};
    use crate::trigger::DryRunTrigger;
    use retro_model::{ExitPolicy, Label, LabelStatus};
    use std::{collections::HashMap, time::Duration};

    fn both_labels() -> Vec<LabelPipeline> {
        vec![
            pipeline(Label::Department, 1500),
            pipeline(Label::Urgency, 1500),
        ]
    }

    fn counts(department: u64, urgency: u64) -> Arc<FixedCounts> {
        Arc::new(FixedCounts(HashMap::from([
            (Label::Department, Ok(department)),
            (Label::Urgency, Ok(urgency)),
        ])))
    }

    #[tokio::test(start_paused = true)]
    async fn one_label_times_out_while_the_other_retrains() {
        let metadata = Arc::new(ScriptedMetadata::new());
        metadata
            .ok(Label::Department, "v1", 500) // baseline
            .ok(Label::Department, "v1", 500) // first tick: stale
            .ok(Label::Department, "v2", 1600);
        metadata.ok(Label::Urgency, "v1", 10);
        let trigger = RecordingTrigger::new();
        let orch = Orchestrator::new(config(both_labels()), counts(1000, 1200), metadata, trigger.clone());
        let start = Instant::now();

        let summary = orch.run_once().await.unwrap();

        let dept = &summary.outcomes[&Label::Department];
        assert_eq!(dept.phase, LabelPhase::RetrainTriggered);
        assert_eq!(dept.status, LabelStatus::Succeeded);
        assert_eq!(dept.snapshot.as_ref().unwrap().version_tag, "v2");

        let urgency = &summary.outcomes[&Label::Urgency];
        assert_eq!(urgency.phase, LabelPhase::Timeout);
        assert_eq!(urgency.status, LabelStatus::Failed);
        assert_eq!(urgency.required_len, 1800);

        assert_eq!(
            trigger.calls(),
            vec![
                ("org/prepare-dataset".to_string(), "department,urgency".to_string()),
                ("org/retrain-department".to_string(), "department".to_string()),
            ]
        );
        // Labels wait concurrently: the run ends just past the slowest deadline.
        assert!(start.elapsed() > Duration::from_secs(300));
        assert!(start.elapsed() < Duration::from_secs(301));
        assert_eq!(summary.exit_code(ExitPolicy::BestEffort), 0);
        assert_eq!(summary.exit_code(ExitPolicy::AnyFailure), 2);
        assert_eq!(summary.exit_code(ExitPolicy::AllFailed), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn labels_below_threshold_trigger_nothing() {
        let metadata = Arc::new(ScriptedMetadata::new());
        let trigger = RecordingTrigger::new();
        let orch = Orchestrator::new(config(both_labels()), counts(900, 0), metadata.clone(), trigger.clone());

        let summary = orch.run_once().await.unwrap();

        for label in Label::ALL {
            let o = &summary.outcomes[&label];
            assert_eq!(o.phase, LabelPhase::Idle);
            assert_eq!(o.status, LabelStatus::Skipped);
        }
        assert_eq!(summary.outcomes[&Label::Department].required_len, 1350);
        assert!(trigger.calls().is_empty());
        assert_eq!(metadata.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn prep_failure_fails_every_flagged_label() {
        let metadata = Arc::new(ScriptedMetadata::new());
        let trigger = RecordingTrigger::failing(&["org/prepare-dataset"]);
        let orch = Orchestrator::new(config(both_labels()), counts(1000, 100), metadata.clone(), trigger.clone());

        let summary = orch.run_once().await.unwrap();

        let dept = &summary.outcomes[&Label::Department];
        assert_eq!(dept.phase, LabelPhase::PrepTriggerFailed);
        assert_eq!(dept.status, LabelStatus::Failed);
        assert!(dept.error.as_deref().unwrap().contains("500"));
        assert_eq!(summary.outcomes[&Label::Urgency].status, LabelStatus::Skipped);
        assert_eq!(trigger.calls().len(), 1);
        assert_eq!(metadata.calls(), 0);
        assert_eq!(summary.exit_code(ExitPolicy::AllFailed), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn retrain_trigger_failure_stays_local() {
        let metadata = Arc::new(ScriptedMetadata::new());
        metadata.ok(Label::Department, "v1", 0).ok(Label::Department, "v2", 2000);
        metadata.ok(Label::Urgency, "v1", 0).ok(Label::Urgency, "v2", 2000);
        let trigger = RecordingTrigger::failing(&["org/retrain-urgency"]);
        let orch = Orchestrator::new(config(both_labels()), counts(1000, 1000), metadata, trigger);

        let summary = orch.run_once().await.unwrap();

        assert_eq!(summary.outcomes[&Label::Department].status, LabelStatus::Succeeded);
        let urgency = &summary.outcomes[&Label::Urgency];
        assert_eq!(urgency.phase, LabelPhase::DatasetReady);
        assert_eq!(urgency.status, LabelStatus::Failed);
        assert_eq!(urgency.snapshot.as_ref().unwrap().version_tag, "v2");
    }

    #[tokio::test(start_paused = true)]
    async fn count_failure_does_not_block_other_labels() {
        let metadata = Arc::new(ScriptedMetadata::new());
        metadata.ok(Label::Urgency, "v1", 0).ok(Label::Urgency, "v2", 2000);
        let counts = Arc::new(FixedCounts(HashMap::from([
            (Label::Department, Err("db down".to_string())),
            (Label::Urgency, Ok(1000)),
        ])));
        let trigger = RecordingTrigger::new();
        let orch = Orchestrator::new(config(both_labels()), counts, metadata, trigger.clone());

        let summary = orch.run_once().await.unwrap();

        let dept = &summary.outcomes[&Label::Department];
        assert_eq!(dept.status, LabelStatus::Failed);
        assert_eq!(dept.phase, LabelPhase::Idle);
        assert_eq!(summary.outcomes[&Label::Urgency].phase, LabelPhase::RetrainTriggered);
        assert_eq!(trigger.calls()[0].1, "urgency");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_baseline_skips_the_retrain() {
        let metadata = Arc::new(ScriptedMetadata::new());
        metadata
            .fail(Label::Urgency)
            .fail(Label::Urgency)
            .fail(Label::Urgency)
            .ok(Label::Urgency, "v1", 2000);
        let trigger = RecordingTrigger::new();
        let orch = Orchestrator::new(
            config(vec![pipeline(Label::Urgency, 1500)]),
            counts(0, 1000),
            metadata.clone(),
            trigger.clone(),
        );

        let summary = orch.run_once().await.unwrap();

        let urgency = &summary.outcomes[&Label::Urgency];
        assert_eq!(urgency.phase, LabelPhase::PrepTriggered);
        assert_eq!(urgency.status, LabelStatus::Failed);
        assert!(urgency.snapshot.is_none());
        assert_eq!(
            trigger.calls(),
            vec![("org/prepare-dataset".to_string(), "urgency".to_string())]
        );
        // Only the three baseline attempts; no dataset wait.
        assert_eq!(metadata.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_run_is_refused_and_last_summary_kept() {
        let metadata = Arc::new(ScriptedMetadata::new());
        metadata.ok(Label::Urgency, "v1", 0);
        let orch = Arc::new(Orchestrator::new(
            config(vec![pipeline(Label::Urgency, 10)]),
            counts(0, 100),
            metadata,
            RecordingTrigger::new(),
        ));
        assert!(orch.last_summary().is_none());

        let first = tokio::spawn({
            let orch = Arc::clone(&orch);
            async move { orch.run_once().await }
        });
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(orch.is_running());
        assert!(matches!(orch.run_once().await, Err(RunError::AlreadyRunning)));

        let summary = first.await.unwrap().unwrap();
        assert!(!orch.is_running());
        assert_eq!(orch.last_summary().unwrap().run_id, summary.run_id);
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_run_holds_the_slot_until_done() {
        let metadata = Arc::new(ScriptedMetadata::new());
        metadata.ok(Label::Urgency, "v1", 0);
        let orch = Arc::new(Orchestrator::new(
            config(vec![pipeline(Label::Urgency, 10)]),
            counts(0, 100),
            metadata,
            RecordingTrigger::new(),
        ));

        let handle = orch.spawn_run().unwrap();
        assert!(orch.is_running());
        assert!(matches!(orch.spawn_run(), Err(RunError::AlreadyRunning)));

        let summary = handle.await.unwrap();
        assert_eq!(summary.count(LabelStatus::Failed), 1);
        assert!(!orch.is_running());
        assert!(orch.spawn_run().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_ends_waiting_labels() {
        let metadata = Arc::new(ScriptedMetadata::new());
        metadata.ok(Label::Urgency, "v1", 0);
        let cancel = CancellationToken::new();
        let orch = Orchestrator::new(
            config(vec![pipeline(Label::Urgency, 10)]),
            counts(0, 100),
            metadata,
            RecordingTrigger::new(),
        )
        .with_cancellation(cancel.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(90)).await;
            cancel.cancel();
        });
        let summary = orch.run_once().await.unwrap();
        canceller.await.unwrap();

        let o = &summary.outcomes[&Label::Urgency];
        assert_eq!(o.phase, LabelPhase::WaitingForDataset);
        assert_eq!(o.status, LabelStatus::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn dry_run_completes_without_remote_jobs() {
        let metadata = Arc::new(ScriptedMetadata::new());
        metadata.ok(Label::Department, "v1", 0).ok(Label::Department, "v2", 1500);
        let trigger = Arc::new(DryRunTrigger::new());
        let orch = Orchestrator::new(
            config(vec![pipeline(Label::Department, 1500)]),
            counts(1000, 0),
            metadata,
            trigger.clone(),
        );

        let summary = orch.run_once().await.unwrap();

        assert_eq!(summary.outcomes[&Label::Department].status, LabelStatus::Succeeded);
        assert_eq!(trigger.actions().len(), 2);
    }
}
