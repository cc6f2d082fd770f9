//! Process configuration for the retraining control loop.
//!
//! Built once at startup from a key lookup (the process environment in production, a map in tests) and passed into component constructors.
mod credential;
mod error;
mod lookup;

pub use credential::Credential;
pub use error::{ConfigError, ConfigResult};
pub use lookup::Lookup;

use std::time::Duration;

use serde::Serialize;

use retro_model::{
    DEFAULT_DECISION_THRESHOLD, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_POLL_TIMEOUT_SECS,
    DEFAULT_SAMPLE_SIZE, DEFAULT_THRESHOLD, ExitPolicy, Label, LabelPipeline, RetryPolicy,
};

/// Default base URL of the job/metadata hub.
pub const DEFAULT_HUB_ENDPOINT: &str = "https://huggingface.co";

/// Per-call timeout of a metadata fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound, in seconds, of configured waits and intervals (30 days).
pub const MAX_WAIT_SECS: u64 = 30 * 86_400;

/// Settings of the challenger gate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvaluatorConfig {
    /// Maximal number of held-out examples sent to the champion.
    pub sample_size: usize,
    /// Minimal macro-F1 improvement the challenger must exceed.
    pub decision_threshold: f64,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE,
            decision_threshold: DEFAULT_DECISION_THRESHOLD,
        }
    }
}

/// Immutable configuration of one process.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Misclassification store connection string.
    pub database_url: Credential,
    /// Hub token; absent only in dry-run mode.
    pub hub_token: Option<Credential>,
    /// Hub base URL used by the job trigger.
    pub hub_endpoint: String,
    /// One pipeline per label, in evaluation order.
    pub pipelines: Vec<LabelPipeline>,
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
    /// Retry policy of a single metadata fetch.
    pub fetch_retry: RetryPolicy,
    pub fetch_timeout: Duration,
    pub evaluator: EvaluatorConfig,
    pub exit_policy: ExitPolicy,
    /// Record trigger actions instead of calling the hub.
    pub dry_run: bool,
}

impl OrchestratorConfig {
    /// Build the configuration from the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(get: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Lookup::new(get);

        let dry_run = env.flag("DRY_RUN");
        let database_url = Credential::new(env.required("DATABASE_URL")?);
        let hub_token = match env.optional("HF_TOKEN") {
            Some(token) => Some(Credential::new(token)),
            None if dry_run => None,
            None => return Err(ConfigError::Missing("HF_TOKEN")),
        };
        let hub_endpoint = env
            .optional("HF_ENDPOINT")
            .unwrap_or_else(|| DEFAULT_HUB_ENDPOINT.to_string())
            .trim_end_matches('/')
            .to_string();

        let prep_job = env.required("PREPARE_DATASET_REPO")?;

        let department = LabelPipeline::new(
            Label::Department,
            env.positive_or("THRESHOLD_DEPARTMENT", DEFAULT_THRESHOLD)?,
            prep_job.clone(),
            env.required("RETRAIN_DEPT_REPO")?,
            env.required("HF_HUB_METADATA_DEPT")?,
        );
        let department = with_serving(department, &env, "DEPT_API_ENDPOINT", "DEPT_SPACE_REPO");

        let urgency = LabelPipeline::new(
            Label::Urgency,
            env.positive_or("THRESHOLD_URGENCY", DEFAULT_THRESHOLD)?,
            prep_job,
            env.required("RETRAIN_URGENCY_REPO")?,
            env.required("HF_HUB_METADATA_URGENCY")?,
        );
        let urgency = with_serving(urgency, &env, "URGENCY_API_ENDPOINT", "URGENCY_SPACE_REPO");

        let poll_interval =
            Duration::from_secs(env.bounded_or("POLL_INTERVAL", DEFAULT_POLL_INTERVAL_SECS, MAX_WAIT_SECS)?);
        let poll_timeout =
            Duration::from_secs(env.bounded_or("POLL_TIMEOUT", DEFAULT_POLL_TIMEOUT_SECS, MAX_WAIT_SECS)?);

        let sample_size = env.parse_or("DEPLOYED_SAMPLE_SIZE", DEFAULT_SAMPLE_SIZE)?;
        let decision_threshold = env.parse_or("DECISION_THRESHOLD", DEFAULT_DECISION_THRESHOLD)?;
        if !decision_threshold.is_finite() || decision_threshold < 0.0 {
            return Err(ConfigError::Invalid {
                key: "DECISION_THRESHOLD",
                value: decision_threshold.to_string(),
                reason: "must be a finite non-negative number".into(),
            });
        }
        let exit_policy = env.parse_or("EXIT_POLICY", ExitPolicy::default())?;

        Ok(Self {
            database_url,
            hub_token,
            hub_endpoint,
            pipelines: vec![department, urgency],
            poll_interval,
            poll_timeout,
            fetch_retry: RetryPolicy::default(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            evaluator: EvaluatorConfig {
                sample_size,
                decision_threshold,
            },
            exit_policy,
            dry_run,
        })
    }

    /// Pipeline of `label`, if configured.
    pub fn pipeline(&self, label: Label) -> Option<&LabelPipeline> {
        self.pipelines.iter().find(|p| p.label == label)
    }
}

fn with_serving<F>(
    mut pipeline: LabelPipeline,
    env: &Lookup<F>,
    endpoint_key: &str,
    job_key: &str,
) -> LabelPipeline
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(endpoint) = env.optional(endpoint_key) {
        pipeline = pipeline.with_serving_endpoint(endpoint.trim_end_matches('/'));
    }
    if let Some(job) = env.optional(job_key) {
        pipeline = pipeline.with_serving_job(job);
    }
    pipeline
}
