//! Per-label task: baseline, dataset wait, retrain trigger.
use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use retro_model::{LabelOutcome, LabelPhase, LabelPipeline};

use crate::{
    error::PollError,
    metrics::{MetricsHandle, TriggerKind},
    poller::DatasetPoller,
    trigger::TriggerHandle,
};

/// Everything a flagged label needs after the prep job was triggered.
pub(super) struct LabelTask {
    pub pipeline: LabelPipeline,
    pub required_len: u64,
    pub poller: Arc<DatasetPoller>,
    pub trigger: TriggerHandle,
    pub metrics: MetricsHandle,
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
    pub cancel: CancellationToken,
}

impl LabelTask {
    /// Drive the label from `PREP_TRIGGERED` to a terminal phase. Never fails: errors end up in the outcome.
    pub(super) async fn run(self) -> LabelOutcome {
        let label = self.pipeline.label;

        // Without a baseline a pre-existing snapshot would pass as new.
        let last_version = match self.poller.current_version(&self.pipeline).await {
            Ok(snapshot) => Some(snapshot.version_tag),
            Err(e) => {
                self.metrics.record_fetch_failure(label);
                warn!(%label, error = %e, "baseline metadata unavailable; skipping label");
                return LabelOutcome::failed(
                    label,
                    LabelPhase::PrepTriggered,
                    self.required_len,
                    format!("baseline metadata unavailable: {e}"),
                );
            }
        };

        info!(%label, phase = %LabelPhase::WaitingForDataset, last_version = ?last_version, "waiting for dataset");
        let snapshot = match self
            .poller
            .wait_for_update(
                &self.pipeline,
                self.required_len,
                last_version.as_deref(),
                self.poll_interval,
                self.poll_timeout,
                &self.cancel,
            )
            .await
        {
            Ok(snapshot) => snapshot,
            Err(e @ PollError::Timeout { .. }) => {
                return LabelOutcome::failed(label, LabelPhase::Timeout, self.required_len, e.to_string());
            }
            Err(e @ PollError::Canceled { .. }) => {
                return LabelOutcome::failed(
                    label,
                    LabelPhase::WaitingForDataset,
                    self.required_len,
                    e.to_string(),
                );
            }
        };

        info!(
            %label,
            phase = %LabelPhase::DatasetReady,
            version_tag = %snapshot.version_tag,
            num_samples = snapshot.num_samples,
            "dataset ready"
        );
        match self.trigger.trigger(&self.pipeline.retrain_job, label.as_str()).await {
            Ok(handle) => {
                self.metrics.record_trigger(TriggerKind::Retrain, true);
                info!(%label, job_ref = %handle.job_ref, dry_run = handle.dry_run, "retrain triggered");
                LabelOutcome::succeeded(label, self.required_len, snapshot)
            }
            Err(e) => {
                self.metrics.record_trigger(TriggerKind::Retrain, false);
                warn!(%label, error = %e, "retrain trigger failed");
                LabelOutcome::failed(label, LabelPhase::DatasetReady, self.required_len, e.to_string())
                    .with_snapshot(snapshot)
            }
        }
    }
}
