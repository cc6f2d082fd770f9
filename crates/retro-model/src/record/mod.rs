mod snapshot;
pub use snapshot::DatasetSnapshot;

mod run;
pub use run::{ClassMetrics, ClassificationReport, Decision, TrainingRun};

mod version;
pub use version::{ModelVersion, version_tag_at, version_tag_for};

mod job;
pub use job::{JobHandle, JobStatus};
