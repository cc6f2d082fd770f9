use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use retro_core::{Orchestrator, TriggerHandle};
use retro_model::{JobHandle, Label, RunSummary};
use retro_prometheus::PrometheusMetrics;

use crate::{
    error::ApiError,
    handler::{ApiHandler, MetricsExposition},
};

/// [`ApiHandler`] backed by a shared [`Orchestrator`] and the job trigger it uses.
pub struct OrchestratorApiAdapter {
    orchestrator: Arc<Orchestrator>,
    trigger: TriggerHandle,
    metrics: Option<PrometheusMetrics>,
}

impl OrchestratorApiAdapter {
    pub fn new(orchestrator: Arc<Orchestrator>, trigger: TriggerHandle) -> Self {
        Self {
            orchestrator,
            trigger,
            metrics: None,
        }
    }

    /// Serve `metrics` on the metrics route.
    pub fn with_metrics(mut self, metrics: PrometheusMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

#[async_trait]
impl ApiHandler for OrchestratorApiAdapter {
    async fn start_run(&self) -> Result<(), ApiError> {
        let handle = self.orchestrator.spawn_run()?;
        info!("orchestration run requested over the api");
        tokio::spawn(async move {
            if let Err(e) = handle.await {
                warn!(error = %e, "api-requested run aborted");
            }
        });
        Ok(())
    }

    async fn latest_run(&self) -> Result<Option<RunSummary>, ApiError> {
        Ok(self.orchestrator.last_summary())
    }

    async fn trigger_dataset(&self) -> Result<JobHandle, ApiError> {
        let pipelines = &self.orchestrator.config().pipelines;
        let first = pipelines
            .first()
            .ok_or_else(|| ApiError::NotFound("no label pipelines configured".into()))?;
        let labels = pipelines
            .iter()
            .map(|p| p.label.as_str())
            .collect::<Vec<_>>()
            .join(",");

        let handle = self.trigger.trigger(&first.prep_job, &labels).await?;
        info!(job_ref = %handle.job_ref, labels = %labels, "manual dataset preparation triggered");
        Ok(handle)
    }

    async fn trigger_retrain(&self, label: Label) -> Result<JobHandle, ApiError> {
        let pipeline = self
            .orchestrator
            .config()
            .pipeline(label)
            .ok_or_else(|| ApiError::NotFound(format!("label {label} is not configured")))?;

        let handle = self
            .trigger
            .trigger(&pipeline.retrain_job, label.as_str())
            .await?;
        info!(job_ref = %handle.job_ref, %label, "manual retrain triggered");
        Ok(handle)
    }

    async fn metrics(&self) -> Result<MetricsExposition, ApiError> {
        let metrics = self
            .metrics
            .as_ref()
            .ok_or_else(|| ApiError::NotFound("metrics are not enabled".into()))?;
        let (body, content_type) = metrics
            .encode()
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        Ok(MetricsExposition { body, content_type })
    }
}
