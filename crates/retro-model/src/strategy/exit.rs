use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// How per-label failures map to the process exit status.
///
/// - `BestEffort`: the run succeeds once every flagged label was attempted.
/// - `AnyFailure`: the run fails if at least one label failed.
/// - `AllFailed`: the run fails if some label failed and none succeeded.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExitPolicy {
    #[default]
    BestEffort,
    AnyFailure,
    AllFailed,
}

impl FromStr for ExitPolicy {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "best-effort" | "always-zero" => Ok(ExitPolicy::BestEffort),
            "any-failure" | "any" => Ok(ExitPolicy::AnyFailure),
            "all-failed" | "all" => Ok(ExitPolicy::AllFailed),
            other => Err(ModelError::UnknownExitPolicy(other.to_string())),
        }
    }
}

impl fmt::Display for ExitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExitPolicy::BestEffort => "best-effort",
            ExitPolicy::AnyFailure => "any-failure",
            ExitPolicy::AllFailed => "all-failed",
        })
    }
}
