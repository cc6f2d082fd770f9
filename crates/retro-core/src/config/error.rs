use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("missing required variable: {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: '{value}' ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
