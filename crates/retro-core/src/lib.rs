pub mod config;
pub mod deploy;
pub mod error;
pub mod evaluate;
pub mod metrics;
pub mod monitor;
pub mod orchestrator;
pub mod poller;
pub mod retry;
pub mod train;
pub mod trigger;

pub use config::{ConfigError, Credential, EvaluatorConfig, Lookup, MAX_WAIT_SECS, OrchestratorConfig};
pub use deploy::{DeploymentController, ManifestRegistry, ModelRegistry};
pub use error::{CountError, DeployError, FetchError, JobError, PollError, RunError, TrainError};
pub use evaluate::{ChallengerEvaluator, ChampionClient, Evaluation, gate, macro_f1};
pub use metrics::{MetricsBackend, MetricsHandle, NoOpMetrics, TriggerKind, noop_metrics};
pub use monitor::{MisclassificationSource, ThresholdMonitor, ThresholdVerdict, required_len};
pub use orchestrator::Orchestrator;
pub use poller::{DatasetPoller, MetadataSource};
pub use retry::retry;
pub use train::{RetrainError, Trainer, TrainerOutput, TrainingCoordinator, TrainingOutcome};
pub use trigger::{DryRunTrigger, JobTrigger, TriggerHandle};

pub mod prelude {
    pub use crate::config::OrchestratorConfig;
    pub use crate::error::{DeployError, FetchError, JobError, PollError, RunError, TrainError};
    pub use crate::evaluate::ChampionClient;
    pub use crate::monitor::MisclassificationSource;
    pub use crate::orchestrator::Orchestrator;
    pub use crate::poller::MetadataSource;
    pub use crate::train::Trainer;
    pub use crate::trigger::JobTrigger;
}

#[cfg(test)]
pub(crate) mod testing;
