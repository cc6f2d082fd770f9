mod domain;
pub use domain::{
    DEFAULT_DECISION_THRESHOLD, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_POLL_TIMEOUT_SECS,
    DEFAULT_SAMPLE_SIZE, DEFAULT_THRESHOLD, EVALUATION_SEED,
};
pub use domain::{JobRef, Label, LabelPipeline, RunId, VersionTag};

mod error;
pub use error::{ModelError, ModelResult};

mod record;
pub use record::{
    ClassMetrics, ClassificationReport, DatasetSnapshot, Decision, JobHandle, JobStatus,
    ModelVersion, TrainingRun, version_tag_at, version_tag_for,
};

mod strategy;
pub use strategy::{BackoffStrategy, ExitPolicy, JitterStrategy, RetryPolicy};

mod summary;
pub use summary::{LabelOutcome, LabelPhase, LabelStatus, RunSummary};
