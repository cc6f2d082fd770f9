use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{ModelError, ModelResult};

/// Random spread applied on top of a backoff delay.
///
/// Spreads retries of concurrent label pipelines hitting the same endpoint.
///
/// Strategies:
/// - `None`: delays are used as computed.
/// - `Full`: delay is sampled uniformly from `[0, base]`.
/// - `Equal`: delay is `base/2` plus a uniform sample from `[0, base/2]`.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JitterStrategy {
    #[default]
    None,
    Full,
    Equal,
}

impl FromStr for JitterStrategy {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(JitterStrategy::None),
            "full" => Ok(JitterStrategy::Full),
            "equal" => Ok(JitterStrategy::Equal),
            other => Err(ModelError::UnknownJitter(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_strategies() {
        assert_eq!("".parse::<JitterStrategy>().unwrap(), JitterStrategy::None);
        assert_eq!("FULL".parse::<JitterStrategy>().unwrap(), JitterStrategy::Full);
        assert_eq!("equal".parse::<JitterStrategy>().unwrap(), JitterStrategy::Equal);
        assert!("decorrelated".parse::<JitterStrategy>().is_err());
    }
}
