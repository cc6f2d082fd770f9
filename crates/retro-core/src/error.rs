use std::time::Duration;

use thiserror::Error;

use retro_model::{JobRef, Label, ModelVersion};

/// Failure of a single remote call.
///
/// Transient by nature: callers retry it through [`crate::retry`].
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("http status {status}")]
    Status { status: u16 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("decode error: {0}")]
    Decode(String),
}

/// Remote job trigger failure.
#[derive(Debug, Clone, Error)]
pub enum JobError {
    #[error("not authorized to restart '{job_ref}' (status {status})")]
    Unauthorized { job_ref: JobRef, status: u16 },

    #[error("job '{job_ref}' not found")]
    NotFound { job_ref: JobRef },

    #[error("restart of '{job_ref}' failed with status {status}")]
    Status { job_ref: JobRef, status: u16 },

    #[error("restart of '{job_ref}' failed: {reason}")]
    Transport { job_ref: JobRef, reason: String },

    #[error("no credential configured for job '{job_ref}'")]
    MissingCredential { job_ref: JobRef },
}

/// Dataset poller failure. Fatal for the affected label only.
#[derive(Debug, Clone, Error)]
pub enum PollError {
    #[error("no dataset update for {label} after {elapsed:?}")]
    Timeout { label: Label, elapsed: Duration },

    #[error("dataset wait for {label} canceled")]
    Canceled { label: Label },
}

/// Misclassification count query failure.
#[derive(Debug, Clone, Error)]
pub enum CountError {
    #[error("count query for {label} failed: {reason}")]
    Query { label: Label, reason: String },
}

/// Trainer failure; aborts only the current label's retrain.
#[derive(Debug, Clone, Error)]
pub enum TrainError {
    #[error("failed to start trainer: {0}")]
    Spawn(String),

    #[error("trainer exited with {0}")]
    Exit(String),

    #[error("invalid trainer output: {0}")]
    Output(String),

    #[error("training canceled")]
    Canceled,

    #[error("training failed: {0}")]
    Failed(String),
}

/// Deployment failure.
#[derive(Debug, Clone, Error)]
pub enum DeployError {
    #[error("run '{run_id}' is not accepted and cannot be deployed")]
    NotAccepted { run_id: String },

    #[error("registry error: {0}")]
    Registry(String),

    /// The registry already promoted `version` but the serving endpoint was not restarted.
    #[error("version {} promoted but serving restart failed: {source}", version.version_tag)]
    PartialFailure {
        version: ModelVersion,
        #[source]
        source: JobError,
    },
}

/// Orchestration run failure.
#[derive(Debug, Clone, Error)]
pub enum RunError {
    #[error("a run is already in progress")]
    AlreadyRunning,
}
