mod label;
pub use label::Label;

mod pipeline;
pub use pipeline::LabelPipeline;

mod constants;
pub use constants::{
    DEFAULT_DECISION_THRESHOLD, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_POLL_TIMEOUT_SECS,
    DEFAULT_SAMPLE_SIZE, DEFAULT_THRESHOLD, EVALUATION_SEED,
};

/// Reference to a remote compute job (e.g. a hub space id such as `org/prepare-dataset`).
///
/// Opaque to the control loop: only the job trigger backend interprets it.
pub type JobRef = String;

/// Version tag of a dataset snapshot or a model version.
pub type VersionTag = String;

/// Identifier of a single training run.
pub type RunId = String;
