use serde::{Deserialize, Serialize};

use crate::domain::{JobRef, Label};

/// Static configuration of one label's retraining pipeline.
///
/// Loaded once at startup and shared read-only by every component of a run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelPipeline {
    /// Label this pipeline retrains.
    pub label: Label,
    /// Minimal required dataset length that triggers dataset regeneration.
    pub threshold: u64,
    /// Dataset preparation job (shared by all labels, triggered once per run).
    pub prep_job: JobRef,
    /// Retrain job for this label.
    pub retrain_job: JobRef,
    /// Endpoint publishing the current dataset snapshot metadata.
    pub metadata_url: String,
    /// Base URL of the live champion (`{serving_endpoint}/predict`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serving_endpoint: Option<String>,
    /// Job that serves the champion; restarted after a deploy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serving_job: Option<JobRef>,
}

impl LabelPipeline {
    /// Create a pipeline without serving references.
    pub fn new(
        label: Label,
        threshold: u64,
        prep_job: impl Into<JobRef>,
        retrain_job: impl Into<JobRef>,
        metadata_url: impl Into<String>,
    ) -> Self {
        Self {
            label,
            threshold,
            prep_job: prep_job.into(),
            retrain_job: retrain_job.into(),
            metadata_url: metadata_url.into(),
            serving_endpoint: None,
            serving_job: None,
        }
    }

    /// Attach the champion inference endpoint.
    pub fn with_serving_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.serving_endpoint = Some(endpoint.into());
        self
    }

    /// Attach the job restarted after a successful deploy.
    pub fn with_serving_job(mut self, job: impl Into<JobRef>) -> Self {
        self.serving_job = Some(job.into());
        self
    }
}
