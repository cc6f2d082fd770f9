//! Remote job triggers.
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::info;

use retro_model::{JobHandle, JobRef};

use crate::error::JobError;

/// Fires a remote compute job by reference.
#[async_trait]
pub trait JobTrigger: Send + Sync {
    /// Trigger name used in logs.
    fn name(&self) -> &'static str;

    /// Restart `job_ref`; `label` names the label(s) the job runs for and is only used for logging.
    async fn trigger(&self, job_ref: &str, label: &str) -> Result<JobHandle, JobError>;
}

/// Shared trigger handle.
pub type TriggerHandle = Arc<dyn JobTrigger>;

/// Trigger that performs no remote call and records the intended actions.
#[derive(Debug, Default)]
pub struct DryRunTrigger {
    actions: Mutex<Vec<(JobRef, String)>>,
}

impl DryRunTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intended actions in call order, as `(job_ref, label)` pairs.
    pub fn actions(&self) -> Vec<(JobRef, String)> {
        self.actions
            .lock()
            .map(|a| a.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

#[async_trait]
impl JobTrigger for DryRunTrigger {
    fn name(&self) -> &'static str {
        "dry-run"
    }

    async fn trigger(&self, job_ref: &str, label: &str) -> Result<JobHandle, JobError> {
        info!(job_ref, label, "dry run: would restart job");
        let mut actions = self
            .actions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        actions.push((job_ref.to_string(), label.to_string()));
        Ok(JobHandle::dry_run(job_ref))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retro_model::JobStatus;

    #[tokio::test]
    async fn dry_run_records_without_failing() {
        let trigger = DryRunTrigger::new();
        let h = trigger
            .trigger("org/prepare-dataset", "department,urgency")
            .await
            .unwrap();
        assert!(h.dry_run);
        assert_eq!(h.last_status, JobStatus::DryRun);
        assert_eq!(h.job_ref, "org/prepare-dataset");

        trigger.trigger("org/retrain-dept", "department").await.unwrap();
        assert_eq!(
            trigger.actions(),
            vec![
                ("org/prepare-dataset".to_string(), "department,urgency".to_string()),
                ("org/retrain-dept".to_string(), "department".to_string()),
            ]
        );
    }
}
