use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, macros::format_description};

use crate::domain::{RunId, VersionTag};

/// A published model artifact.
///
/// At most one version per label is `deployed` (the champion); the registry enforces it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelVersion {
    pub version_tag: VersionTag,
    pub registry_ref: String,
    pub parent_run_id: RunId,
    pub deployed: bool,
}

/// Build a version tag (`vYYYYMMDD_HHMMSS`) from a UTC timestamp.
pub fn version_tag_at(at: OffsetDateTime) -> VersionTag {
    let fmt = format_description!("v[year][month][day]_[hour][minute][second]");
    at.to_offset(time::UtcOffset::UTC)
        .format(&fmt)
        .unwrap_or_else(|_| format!("v{}", at.unix_timestamp()))
}

/// Version tag of a deploy: the UTC timestamp plus the first eight alphanumerics of `run_id`.
///
/// Two runs of one label deployed within the same second still get distinct tags.
pub fn version_tag_for(run_id: &str, at: OffsetDateTime) -> VersionTag {
    let suffix: String = run_id
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(8)
        .collect();
    if suffix.is_empty() {
        return version_tag_at(at);
    }
    format!("{}_{}", version_tag_at(at), suffix.to_ascii_lowercase())
}
