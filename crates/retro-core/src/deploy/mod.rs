//! Publication of accepted challengers.
mod registry;
pub use registry::{ManifestRegistry, ModelRegistry};

use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{error, info, instrument};

use retro_model::{LabelPipeline, ModelVersion, TrainingRun, version_tag_for};

use crate::{
    error::DeployError,
    metrics::{MetricsHandle, TriggerKind, noop_metrics},
    trigger::TriggerHandle,
};

/// Publishes accepted runs and restarts the serving endpoint.
pub struct DeploymentController {
    registry: Arc<dyn ModelRegistry>,
    trigger: TriggerHandle,
    metrics: MetricsHandle,
}

impl DeploymentController {
    pub fn new(registry: Arc<dyn ModelRegistry>, trigger: TriggerHandle) -> Self {
        Self {
            registry,
            trigger,
            metrics: noop_metrics(),
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    /// Deploy an accepted run under a version tag derived from the current UTC time and the run id.
    pub async fn deploy(
        &self,
        run: &TrainingRun,
        pipeline: &LabelPipeline,
        artifact: &str,
    ) -> Result<ModelVersion, DeployError> {
        let tag = version_tag_for(&run.run_id, OffsetDateTime::now_utc());
        self.deploy_as(run, pipeline, artifact, &tag).await
    }

    /// Deploy an accepted run under `version_tag`.
    ///
    /// Steps: push, tag, promote, restart serving job. A restart failure after the promotion is reported as [`DeployError::PartialFailure`] and is not retried.
    #[instrument(level = "info", skip_all, fields(label = %run.label, run_id = %run.run_id, version_tag = version_tag))]
    pub async fn deploy_as(
        &self,
        run: &TrainingRun,
        pipeline: &LabelPipeline,
        artifact: &str,
        version_tag: &str,
    ) -> Result<ModelVersion, DeployError> {
        if !run.is_accepted() {
            return Err(DeployError::NotAccepted {
                run_id: run.run_id.clone(),
            });
        }
        let label = run.label;

        let pushed = self.registry.push(run, artifact, version_tag).await?;
        self.registry.tag(label, &pushed).await?;
        let promoted = self.registry.promote(label, version_tag).await?;

        let Some(serving_job) = pipeline.serving_job.as_deref() else {
            info!("no serving job configured; restart skipped");
            return Ok(promoted);
        };

        match self.trigger.trigger(serving_job, label.as_str()).await {
            Ok(_) => {
                self.metrics.record_trigger(TriggerKind::Serving, true);
                info!(serving_job, "model deployed and serving job restarted");
                Ok(promoted)
            }
            Err(source) => {
                self.metrics.record_trigger(TriggerKind::Serving, false);
                error!(
                    serving_job,
                    error = %source,
                    "registry promoted but serving restart failed; manual reconciliation required"
                );
                Err(DeployError::PartialFailure {
                    version: promoted,
                    source,
                })
            }
        }
    }
}
