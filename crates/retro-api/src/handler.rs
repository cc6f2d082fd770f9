use async_trait::async_trait;
use retro_model::{JobHandle, Label, RunSummary};

use crate::error::ApiError;

/// Rendered metrics body and its content type.
#[derive(Debug, Clone)]
pub struct MetricsExposition {
    pub body: Vec<u8>,
    pub content_type: String,
}

/// Control operations exposed over HTTP.
///
/// Implemented by [`crate::OrchestratorApiAdapter`]; custom handlers can wrap it to add auth or auditing.
#[async_trait]
pub trait ApiHandler: Send + Sync + 'static {
    /// Start an orchestration run in the background.
    ///
    /// Fails with [`ApiError::Conflict`] while another run is in progress.
    async fn start_run(&self) -> Result<(), ApiError>;

    /// Summary of the last finished run.
    async fn latest_run(&self) -> Result<Option<RunSummary>, ApiError>;

    /// Trigger the dataset preparation job for every configured label.
    async fn trigger_dataset(&self) -> Result<JobHandle, ApiError>;

    /// Trigger the retrain job of one label.
    async fn trigger_retrain(&self, label: Label) -> Result<JobHandle, ApiError>;

    /// Current metrics in text exposition format.
    async fn metrics(&self) -> Result<MetricsExposition, ApiError>;
}
