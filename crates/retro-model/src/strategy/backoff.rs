use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{ModelError, ModelResult};

/// Growth of the delay between consecutive retry attempts.
///
/// The delay after the `n`-th failed attempt (1-based) is:
/// - `Fixed`: `base`
/// - `Linear`: `base * n`
/// - `Exponential`: `min(base * factor^(n-1), max)`
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BackoffStrategy {
    Fixed,
    Linear,
    Exponential { factor: f64, max_ms: u64 },
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        BackoffStrategy::Linear
    }
}

impl FromStr for BackoffStrategy {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" | "constant" => Ok(BackoffStrategy::Fixed),
            "linear" | "" => Ok(BackoffStrategy::Linear),
            "exponential" | "exp" => Ok(BackoffStrategy::Exponential {
                factor: 2.0,
                max_ms: 60_000,
            }),
            other => Err(ModelError::UnknownBackoff(other.to_string())),
        }
    }
}
