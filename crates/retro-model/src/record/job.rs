use serde::{Deserialize, Serialize};

use crate::domain::JobRef;

/// Outcome of a single job trigger.
///
/// Lives only for the current invocation; the control loop never tracks the remote job afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobHandle {
    pub job_ref: JobRef,
    pub dry_run: bool,
    pub last_status: JobStatus,
}

impl JobHandle {
    /// Handle of a job that was actually restarted.
    pub fn requested(job_ref: impl Into<JobRef>) -> Self {
        Self {
            job_ref: job_ref.into(),
            dry_run: false,
            last_status: JobStatus::Requested,
        }
    }

    /// Handle of a job that would have been restarted.
    pub fn dry_run(job_ref: impl Into<JobRef>) -> Self {
        Self {
            job_ref: job_ref.into(),
            dry_run: true,
            last_status: JobStatus::DryRun,
        }
    }
}

/// Last known status of a triggered job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Remote restart request was accepted.
    Requested,
    /// No call was made, the intended action was only recorded.
    DryRun,
}
