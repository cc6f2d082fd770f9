use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown label: {0}")]
    UnknownLabel(String),

    #[error("unknown backoff strategy: {0}")]
    UnknownBackoff(String),

    #[error("unknown jitter strategy: {0}")]
    UnknownJitter(String),

    #[error("unknown exit policy: {0}")]
    UnknownExitPolicy(String),

    #[error("decision for run '{run_id}' is already set to {decision}")]
    DecisionAlreadySet { run_id: String, decision: String },

    #[error("invalid model: {0}")]
    Invalid(String),
}

pub type ModelResult<T> = Result<T, ModelError>;
